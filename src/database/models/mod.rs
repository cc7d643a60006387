pub mod activity;
pub mod category;
pub mod client;
pub mod document;
pub mod intake_form;
pub mod user;

pub use activity::{Activity, NewActivity};
pub use category::Category;
pub use client::{Client, ClientWithEmail};
pub use document::{Document, DocumentKey, NewDocument};
pub use intake_form::IntakeForm;
pub use user::{User, UserStats};
