//! Link activation event delivered by the host.

use super::entities::LinkId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the user is doing with the activated link.
///
/// Only [`ActionClass::NavigateOutbound`] and [`ActionClass::OpenContextMenu`]
/// take part in arbitration; everything else is ignored by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionClass {
    NavigateOutbound,
    OpenContextMenu,
    NavigateCustomProtocol,
    NavigateToTarget,
    Other,
}

impl ActionClass {
    /// Whether activations of this class are arbitrated between vendors.
    pub fn is_arbitrated(self) -> bool {
        matches!(self, Self::NavigateOutbound | Self::OpenContextMenu)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NavigateOutbound => "navigate-outbound",
            Self::OpenContextMenu => "open-context-menu",
            Self::NavigateCustomProtocol => "navigate-custom-protocol",
            Self::NavigateToTarget => "navigate-to-target",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ActionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "navigate-outbound" => Ok(Self::NavigateOutbound),
            "open-context-menu" => Ok(Self::OpenContextMenu),
            "navigate-custom-protocol" => Ok(Self::NavigateCustomProtocol),
            "navigate-to-target" => Ok(Self::NavigateToTarget),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown action class '{other}'")),
        }
    }
}

/// A click or context-menu request on one link.
///
/// The host translates its platform events into this value and hands it to
/// [`RewriterCoordinator::on_link_activation`](crate::application::services::RewriterCoordinator::on_link_activation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkActivation {
    pub link: LinkId,
    pub action: ActionClass,
}

impl LinkActivation {
    pub fn new(link: LinkId, action: ActionClass) -> Self {
        Self { link, action }
    }

    /// Shorthand for a regular outbound navigation click.
    pub fn navigate(link: LinkId) -> Self {
        Self::new(link, ActionClass::NavigateOutbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arbitrated_action_classes() {
        assert!(ActionClass::NavigateOutbound.is_arbitrated());
        assert!(ActionClass::OpenContextMenu.is_arbitrated());
        assert!(!ActionClass::NavigateCustomProtocol.is_arbitrated());
        assert!(!ActionClass::NavigateToTarget.is_arbitrated());
        assert!(!ActionClass::Other.is_arbitrated());
    }

    #[test]
    fn test_action_class_parsing() {
        assert_eq!(
            "open-context-menu".parse::<ActionClass>(),
            Ok(ActionClass::OpenContextMenu)
        );
        assert_eq!(
            " navigate-outbound ".parse::<ActionClass>(),
            Ok(ActionClass::NavigateOutbound)
        );
        assert!("middle-click".parse::<ActionClass>().is_err());
    }

    #[test]
    fn test_action_class_round_trips_through_display() {
        for class in [
            ActionClass::NavigateOutbound,
            ActionClass::OpenContextMenu,
            ActionClass::NavigateCustomProtocol,
        ] {
            assert_eq!(class.to_string().parse::<ActionClass>(), Ok(class));
        }
    }

    #[test]
    fn test_activation_creation() {
        let activation = LinkActivation::navigate(LinkId::new(9));

        assert_eq!(activation.link, LinkId::new(9));
        assert_eq!(activation.action, ActionClass::NavigateOutbound);
    }
}
