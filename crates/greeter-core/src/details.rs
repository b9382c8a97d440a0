//! Typed error details carried alongside a generic status.
//!
//! Each detail travels as a protobuf `Any`: a type URL plus the encoded
//! message. Decoding dispatches on the type URL through a [`DetailRegistry`],
//! so call sites never switch over the set of known kinds themselves. A type
//! URL with no registered decoder, or bytes that fail to decode, yield
//! [`Detail::Unknown`] rather than an error.
//!
//! Kinds beyond the built-ins implement [`DetailKind`] and decode to
//! [`Detail::Other`], a shared handle to the typed message. Consumers describe
//! or re-pack it through [`DynDetail`] and recover the concrete type with
//! [`Detail::downcast_ref`], so adding a kind touches no existing match.
//!
//! ## Built-in kinds
//!
//! - [`BadRequest`] - generic field violations (`google.rpc.BadRequest`).
//! - [`CustomError`] - application-defined numbered error
//!   (`greeter.CustomError`).
//!
//! ## Process-wide registry
//!
//! [`registry`] returns the shared registry used when turning a
//! [`tonic::Status`] into a [`Status`](crate::Status). It starts with the
//! built-in kinds; [`register_detail`] adds more and is meant to be called
//! during setup, before calls are in flight.

use crate::proto::{BadRequest, CustomError};
use parking_lot::{RwLock, RwLockReadGuard};
use prost::Message;
use prost_types::Any;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// A decoded status detail.
#[derive(Clone, Debug, PartialEq)]
pub enum Detail {
    BadRequest(BadRequest),
    Custom(CustomError),
    /// Any other registered kind, decoded to its own message type.
    Other(Arc<dyn DynDetail>),
    /// A detail whose type URL is not registered or whose payload did not
    /// decode. The original `Any` is kept so it can be forwarded untouched.
    Unknown(Any),
}

/// A message type that can travel as a status detail.
///
/// Implementors provide the type URL they are packed under. Registering the
/// type with [`DetailRegistry::register`] makes it decodable everywhere the
/// registry is used; by default it lifts into [`Detail::Other`].
pub trait DetailKind: Message + Default + Sized + core::fmt::Debug + 'static {
    const TYPE_URL: &'static str;

    fn into_detail(self) -> Detail {
        Detail::Other(Arc::new(self))
    }

    /// One-line rendering for logs. Defaults to the `Debug` form.
    fn describe(&self) -> String {
        format!("{self:?}")
    }

    /// Packs the message into an `Any` under [`Self::TYPE_URL`].
    fn pack(&self) -> Any {
        Any {
            type_url: Self::TYPE_URL.to_string(),
            value: self.encode_to_vec(),
        }
    }
}

/// Object-safe view of a decoded detail of any registered kind.
pub trait DynDetail: core::fmt::Debug + Send + Sync + 'static {
    fn type_url(&self) -> &str;

    fn to_any(&self) -> Any;

    fn describe(&self) -> String;

    fn as_any(&self) -> &dyn core::any::Any;
}

impl<T: DetailKind> DynDetail for T {
    fn type_url(&self) -> &str {
        T::TYPE_URL
    }

    fn to_any(&self) -> Any {
        self.pack()
    }

    fn describe(&self) -> String {
        DetailKind::describe(self)
    }

    fn as_any(&self) -> &dyn core::any::Any {
        self
    }
}

/// Details compare by their packed form.
impl PartialEq for dyn DynDetail {
    fn eq(&self, other: &Self) -> bool {
        self.to_any() == other.to_any()
    }
}

impl DetailKind for BadRequest {
    const TYPE_URL: &'static str = "type.googleapis.com/google.rpc.BadRequest";

    fn into_detail(self) -> Detail {
        Detail::BadRequest(self)
    }
}

impl DetailKind for CustomError {
    const TYPE_URL: &'static str = "type.googleapis.com/greeter.CustomError";

    fn into_detail(self) -> Detail {
        Detail::Custom(self)
    }
}

impl Detail {
    /// The type URL this detail is (or was) packed under.
    pub fn type_url(&self) -> &str {
        match self {
            Self::BadRequest(_) => BadRequest::TYPE_URL,
            Self::Custom(_) => CustomError::TYPE_URL,
            Self::Other(detail) => detail.type_url(),
            Self::Unknown(any) => &any.type_url,
        }
    }

    pub fn to_any(&self) -> Any {
        match self {
            Self::BadRequest(detail) => detail.pack(),
            Self::Custom(detail) => detail.pack(),
            Self::Other(detail) => detail.to_any(),
            Self::Unknown(any) => any.clone(),
        }
    }

    /// The typed message behind [`Detail::Other`], if it is a `T`.
    pub fn downcast_ref<T: DetailKind>(&self) -> Option<&T> {
        match self {
            Self::Other(detail) => detail.as_any().downcast_ref(),
            _ => None,
        }
    }
}

impl From<BadRequest> for Detail {
    fn from(detail: BadRequest) -> Self {
        Self::BadRequest(detail)
    }
}

impl From<CustomError> for Detail {
    fn from(detail: CustomError) -> Self {
        Self::Custom(detail)
    }
}

impl From<Any> for Detail {
    fn from(any: Any) -> Self {
        Self::Unknown(any)
    }
}

/// Decoder from the raw bytes of an `Any` to a typed [`Detail`].
pub type DecodeFn = fn(&[u8]) -> Result<Detail, prost::DecodeError>;

fn decode_as<T: DetailKind>(bytes: &[u8]) -> Result<Detail, prost::DecodeError> {
    T::decode(bytes).map(T::into_detail)
}

/// Maps detail type URLs to decoders.
#[derive(Clone, Default)]
pub struct DetailRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl DetailRegistry {
    /// A registry with no decoders; every detail decodes to
    /// [`Detail::Unknown`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry that knows [`BadRequest`] and [`CustomError`].
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register::<BadRequest>();
        registry.register::<CustomError>();
        registry
    }

    pub fn register<T: DetailKind>(&mut self) {
        self.register_decoder(T::TYPE_URL, decode_as::<T>);
    }

    /// Associates `type_url` with `decoder`, replacing any earlier entry.
    pub fn register_decoder(&mut self, type_url: impl Into<String>, decoder: DecodeFn) {
        self.decoders.insert(type_url.into(), decoder);
    }

    pub fn is_registered(&self, type_url: &str) -> bool {
        self.decoders.contains_key(type_url)
    }

    /// Decodes one packed detail. Never fails: unregistered or undecodable
    /// payloads come back as [`Detail::Unknown`].
    pub fn decode(&self, any: Any) -> Detail {
        let Some(decode) = self.decoders.get(any.type_url.as_str()) else {
            return Detail::Unknown(any);
        };

        match decode(&any.value) {
            Ok(detail) => detail,
            Err(e) => {
                tracing::debug!("Detail {} failed to decode: {}", any.type_url, e);
                Detail::Unknown(any)
            }
        }
    }
}

impl core::fmt::Debug for DetailRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.decoders.keys()).finish()
    }
}

static REGISTRY: LazyLock<RwLock<DetailRegistry>> =
    LazyLock::new(|| RwLock::new(DetailRegistry::with_builtins()));

/// Read access to the process-wide registry.
pub fn registry() -> RwLockReadGuard<'static, DetailRegistry> {
    REGISTRY.read()
}

/// Adds `T` to the process-wide registry.
pub fn register_detail<T: DetailKind>() {
    REGISTRY.write().register::<T>();
}
