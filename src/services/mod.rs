pub mod cache;
pub mod confidence_notes;
pub mod notification_scheduler;
pub mod recommendation_engine;
pub mod source;
pub mod style_profile;
pub mod timing;
pub mod wardrobe;
pub mod weather;
