//! Registration metadata and callback types shared by every broker

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Whether a path carries a retained property or an instantaneous event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Property,
    Event,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Property => write!(f, "property"),
            Kind::Event => write!(f, "event"),
        }
    }
}

/// Producer/consumer topology of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    /// Many producers write, the broker keeps the last write
    ManyToOne,
    /// A single producer fans out to many consumers
    OneToMany,
}

/// Kind and direction combined, as announced to the broker on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Behaviour {
    #[serde(rename = "PROPERTY-N:1")]
    PropertyManyToOne,
    #[serde(rename = "PROPERTY-1:N")]
    PropertyOneToMany,
    #[serde(rename = "EVENT-N:1")]
    EventManyToOne,
    #[serde(rename = "EVENT-1:N")]
    EventOneToMany,
}

impl Behaviour {
    pub fn new(kind: Kind, direction: Direction) -> Self {
        match (kind, direction) {
            (Kind::Property, Direction::ManyToOne) => Behaviour::PropertyManyToOne,
            (Kind::Property, Direction::OneToMany) => Behaviour::PropertyOneToMany,
            (Kind::Event, Direction::ManyToOne) => Behaviour::EventManyToOne,
            (Kind::Event, Direction::OneToMany) => Behaviour::EventOneToMany,
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Behaviour::PropertyManyToOne | Behaviour::PropertyOneToMany => Kind::Property,
            Behaviour::EventManyToOne | Behaviour::EventOneToMany => Kind::Event,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Behaviour::PropertyManyToOne | Behaviour::EventManyToOne => Direction::ManyToOne,
            Behaviour::PropertyOneToMany | Behaviour::EventOneToMany => Direction::OneToMany,
        }
    }

    /// Wire name of the behaviour
    pub fn as_str(&self) -> &'static str {
        match self {
            Behaviour::PropertyManyToOne => "PROPERTY-N:1",
            Behaviour::PropertyOneToMany => "PROPERTY-1:N",
            Behaviour::EventManyToOne => "EVENT-N:1",
            Behaviour::EventOneToMany => "EVENT-1:N",
        }
    }
}

impl fmt::Display for Behaviour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional registration settings
///
/// Events are never retained, so their registrations leave every field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOptions {
    /// Ask the broker to delete the retained property once the registrant goes away
    #[serde(rename = "delete-on-unregister", skip_serializing_if = "Option::is_none")]
    pub delete_on_unregister: Option<bool>,
}

impl RegisterOptions {
    pub fn delete_on_unregister(delete: bool) -> Self {
        Self {
            delete_on_unregister: Some(delete),
        }
    }
}

/// A single announcement of a path to the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub path: String,
    pub behaviour: Behaviour,
    pub description: String,
    #[serde(default)]
    pub options: RegisterOptions,
}

impl Registration {
    /// Registration for a retained property
    pub fn property(
        path: impl Into<String>,
        direction: Direction,
        description: impl Into<String>,
        delete_on_unregister: bool,
    ) -> Self {
        Self {
            path: path.into(),
            behaviour: Behaviour::new(Kind::Property, direction),
            description: description.into(),
            options: RegisterOptions::delete_on_unregister(delete_on_unregister),
        }
    }

    /// Registration for an event, which carries no retention policy
    pub fn event(path: impl Into<String>, direction: Direction, description: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            behaviour: Behaviour::new(Kind::Event, direction),
            description: description.into(),
            options: RegisterOptions::default(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.behaviour.kind()
    }
}

/// Handler invoked by a broker with `(path, value)` for each update or occurrence
pub type WatchCallback = Arc<dyn Fn(&str, serde_json::Value) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_behaviour_from_kind_and_direction() {
        for kind in [Kind::Property, Kind::Event] {
            for direction in [Direction::ManyToOne, Direction::OneToMany] {
                let behaviour = Behaviour::new(kind, direction);
                assert_eq!(behaviour.kind(), kind);
                assert_eq!(behaviour.direction(), direction);
            }
        }
    }

    #[test]
    fn test_behaviour_wire_names() {
        let json = serde_json::to_string(&Behaviour::PropertyManyToOne).unwrap();
        assert_eq!(json, r#""PROPERTY-N:1""#);
        assert_eq!(Behaviour::EventOneToMany.to_string(), "EVENT-1:N");
    }

    #[test]
    fn test_property_registration_carries_retention() {
        let reg = Registration::property("foo/bar", Direction::OneToMany, "Something", true);
        assert_eq!(reg.behaviour, Behaviour::PropertyOneToMany);
        assert_eq!(reg.options.delete_on_unregister, Some(true));
    }

    #[test]
    fn test_event_registration_has_no_options() {
        let reg = Registration::event("foo/bar", Direction::ManyToOne, "Something");
        assert_eq!(reg.behaviour, Behaviour::EventManyToOne);
        assert_eq!(reg.options, RegisterOptions::default());

        let json = serde_json::to_value(&reg).unwrap();
        assert_eq!(json["options"], serde_json::json!({}));
    }
}
