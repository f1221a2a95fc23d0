pub mod engagement;
pub mod notification;
pub mod recommendation;
pub mod style_profile;
pub mod wardrobe;
pub mod weather;

pub use engagement::*;
pub use notification::*;
pub use recommendation::*;
pub use style_profile::*;
pub use wardrobe::*;
pub use weather::*;
