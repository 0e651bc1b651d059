pub mod prelude;
pub mod user;
pub mod user_file;

pub use user::Entity as User;
pub use user_file::Entity as UserFile;
