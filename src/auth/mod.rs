pub mod handlers;
pub mod middleware;
pub mod session;

pub use middleware::{redirect_if_authenticated, require_auth};
pub use session::{Flash, SessionUser};
