pub use super::user::Entity as User;
pub use super::user_file::Entity as UserFile;
