//! Protocol definitions, organized the way the protocol itself groups them:
//! stable browser domains under [`browser_protocol`], the javascript domains
//! under [`js_protocol`].

use serde::de::DeserializeOwned;

use chromite_types::MethodType;

/// Declares a newtype around `String` used as an opaque protocol identifier.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn inner(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

/// Wires a params struct up as a [`chromite_types::Command`].
macro_rules! impl_command {
    ($ty:ident, $id:expr, $ret:ty) => {
        impl $ty {
            pub const IDENTIFIER: &'static str = $id;
        }

        impl ::chromite_types::Method for $ty {
            fn identifier(&self) -> ::chromite_types::MethodId {
                Self::IDENTIFIER.into()
            }
        }

        impl ::chromite_types::MethodType for $ty {
            fn method_id() -> ::chromite_types::MethodId {
                Self::IDENTIFIER.into()
            }
        }

        impl ::chromite_types::Command for $ty {
            type Response = $ret;
        }
    };
}

/// Wires an event payload up as a built-in [`Event`].
macro_rules! impl_event {
    ($ty:ident, $id:expr) => {
        impl $ty {
            pub const IDENTIFIER: &'static str = $id;
        }

        impl ::chromite_types::Method for $ty {
            fn identifier(&self) -> ::chromite_types::MethodId {
                Self::IDENTIFIER.into()
            }
        }

        impl ::chromite_types::MethodType for $ty {
            fn method_id() -> ::chromite_types::MethodId {
                Self::IDENTIFIER.into()
            }
        }

        impl $crate::cdp::sealed::SealedEvent for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }

        impl $crate::cdp::IntoEventKind for $ty {
            fn event_kind() -> $crate::cdp::EventKind {
                $crate::cdp::EventKind::BuiltIn
            }
        }
    };
}

pub mod browser_protocol;
pub mod events;
pub mod js_protocol;

pub use events::{CdpEvent, CdpEventMessage};

/// An event emitted by the browser and decoded into a custom type registered
/// by the caller rather than one of the built-in payloads.
///
/// Every `CustomEvent` also requires an implementation of
/// [`chromite_types::MethodType`] and must be `DeserializeOwned`. This is
/// necessary to match the type against the `method` identifier of a
/// [`CdpEventMessage`] and deserialize it from a `serde_json::Value`.
pub trait CustomEvent:
    ::std::any::Any + DeserializeOwned + MethodType + Send + Sync
{
    /// Convert the json params into an instance of this type
    fn from_json(event: serde_json::Value) -> serde_json::Result<Self>
    where
        Self: Sized + 'static,
    {
        serde_json::from_value(event)
    }
}

impl<T: CustomEvent> sealed::SealedEvent for T {
    fn as_any(&self) -> &dyn ::std::any::Any {
        self
    }
}

/// The trait all events share.
///
/// This trait is sealed; the only way to introduce a new `Event` is by
/// implementing [`CustomEvent`].
pub trait Event: sealed::SealedEvent {}

impl<T: sealed::SealedEvent> Event for T {}

impl<T: CustomEvent + Event> sealed::SealedCustomEventConverter for T {}

/// Function type to convert a json event into an instance of itself as a
/// `dyn Event`
pub type EventConversion =
    Box<dyn Fn(serde_json::Value) -> serde_json::Result<::std::sync::Arc<dyn Event>> + Send + 'static>;

/// Does nothing for built-in payloads but carries the conversion closure for
/// custom events.
pub enum EventKind {
    BuiltIn,
    Custom(EventConversion),
}

impl EventKind {
    /// Whether this is a custom event
    pub fn is_custom(&self) -> bool {
        matches!(self, EventKind::Custom(_))
    }
}

impl ::std::fmt::Debug for EventKind {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            EventKind::BuiltIn => f.debug_tuple("BuiltIn").finish(),
            EventKind::Custom(_) => f.debug_tuple("Custom").finish(),
        }
    }
}

/// A trait on top of the [`Event`] trait
pub trait IntoEventKind: Event {
    /// What kind of event this type is
    fn event_kind() -> EventKind
    where
        Self: Sized + 'static;
}

impl<T: sealed::SealedCustomEventConverter> IntoEventKind for T {
    fn event_kind() -> EventKind
    where
        Self: Sized + 'static,
    {
        EventKind::Custom(Box::new(Self::event_arc))
    }
}

pub(crate) mod sealed {
    pub trait SealedCustomEventConverter: super::CustomEvent + super::Event {
        fn event_arc(
            event: serde_json::Value,
        ) -> serde_json::Result<::std::sync::Arc<dyn super::Event>>
        where
            Self: Sized + 'static,
        {
            Ok(::std::sync::Arc::new(Self::from_json(event)?))
        }
    }

    pub trait SealedEvent: ArcAny + chromite_types::MethodType {
        /// generate `&::std::any::Any`'s vtable from `&Trait`'s.
        fn as_any(&self) -> &dyn ::std::any::Any;
    }

    pub trait ArcAny: ::std::any::Any + Send + Sync {
        fn sealed_into_any_arc(
            self: ::std::sync::Arc<Self>,
        ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync>;
    }

    impl<T: ::std::any::Any + Send + Sync> ArcAny for T {
        fn sealed_into_any_arc(
            self: ::std::sync::Arc<Self>,
        ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
            self
        }
    }
}

impl dyn Event {
    /// Returns true if the boxed event is of type `T`.
    #[inline]
    pub fn is<T: Event>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn into_any_arc(
        self: ::std::sync::Arc<Self>,
    ) -> ::std::sync::Arc<dyn ::std::any::Any + Send + Sync> {
        sealed::ArcAny::sealed_into_any_arc(self)
    }
}
