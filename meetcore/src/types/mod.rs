pub mod events;
pub mod navigation;
pub mod notification;
pub mod participant;
pub mod user;

pub use events::{CallEvent, CallingState, SessionEvent};
pub use navigation::NavigationTarget;
pub use notification::{Notification, NotificationKind};
pub use participant::{Counterpart, ParticipantPair};
pub use user::AuthenticatedUser;
