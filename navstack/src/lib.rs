//! Navigation core for mobile UI hosts.
//!
//! A [`Navigator`] owns the active page, the back stack, the popup stack and
//! the page cache. It sequences calls into host-provided view-tree, animation
//! and platform capabilities (see [`nav::host`]) and never renders anything
//! itself.

// Lets `#[derive(NavParams)]` expand to `::navstack::...` inside this crate
extern crate self as navstack;

pub mod nav;

pub use nav::{
    CachePolicy, HardwareBackOutcome, Host, IntoParams, NavConfig, NavError, NavEvent, NavSnapshot, Navigator, Page,
    Params, PopupRef, RevisitMode, ScreenFactory, ScreenKind, ScreenRef, Topic, Transition,
};
pub use navstack_macros::NavParams;
