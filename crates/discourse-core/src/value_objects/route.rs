//! Route - navigation boundary value
//!
//! The view layer owns the actual routing mechanics; services hand back a
//! `Route` describing where the user should land next.

use std::fmt;

use crate::value_objects::Snowflake;

/// Destination returned to the view layer after an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated landing screen
    Landing,
    /// A group's chat screen
    Group(Snowflake),
}

impl Route {
    /// Render the route as a path
    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".to_string(),
            Self::Group(group_id) => format!("/group/{group_id}"),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
