// Effects - Ordered send chain shared by every pad voice

pub mod bus;
pub mod unit;

pub use bus::EffectsBus;
pub use unit::{EffectKind, EffectSend, EffectUnit, ParamSpec};
