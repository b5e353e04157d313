//! External delivery channels.
//!
//! Push (FCM/APNs) and templated email. In-app delivery needs no transport:
//! the stored record is the in-app notification.

pub mod email;
pub mod push;

#[cfg(test)]
pub(crate) mod fakes;
