mod category;
mod pagination;
mod post;
mod tag;
mod user;
mod validation;

pub use category::*;
pub use pagination::*;
pub use post::*;
pub use tag::*;
pub use user::*;
pub use validation::ValidationErrors;
