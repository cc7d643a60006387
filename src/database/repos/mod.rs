pub mod activities;
pub mod categories;
pub mod clients;
pub mod documents;
pub mod forms;
pub mod users;

pub use activities::{ActivityFilter, ActivityRepo};
pub use categories::{CategoryChanges, CategoryRepo, NewCategory};
pub use clients::{ClientRepo, ProfileChanges};
pub use documents::{DocumentStore, PgDocumentStore};
pub use forms::{FormFields, FormRepo};
pub use users::{UserChanges, UserRepo};
