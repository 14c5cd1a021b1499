//! Database entities

pub mod phone;
pub mod user;

pub use phone::Entity as Phone;
pub use user::Entity as User;

pub mod prelude {
    pub use super::phone::Entity as Phone;
    pub use super::user::Entity as User;
}
