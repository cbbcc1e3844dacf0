//! The resolved form of a Brine RPC service definition.
//!
//! Every type lives exactly once in the [`Service`] type table and is referred
//! to everywhere else by a [`TypeId`] handle, so recursive models cost nothing
//! extra to represent.
//!
//! ```
//! use brine_rpc_schema::*;
//!
//! let int = TypeId::new(1);
//! let node = TypeId::new(2);
//! let service = Service::new(
//!     vec![
//!         Type::Scalar("bool".to_owned()),
//!         Type::Scalar("int".to_owned()),
//!         Type::Object(ObjectType::new("Node".to_owned(), vec![
//!             Field::new("value".to_owned(), TypeExpr::Named(int)),
//!             Field::new("next".to_owned(), TypeExpr::optional(TypeExpr::Named(node))),
//!         ])),
//!     ],
//!     vec![],
//! );
//!
//! assert_eq!(service.lookup("Node"), Some(node));
//! assert_eq!(service.display_type(&service.type_of(node).fields()[1].ty), "Node?");
//! ```

pub mod service;
pub mod types;

pub use service::*;
pub use types::*;

/// Built-in scalar type names, in the order they are registered.
pub const SCALAR_TYPES: [&str; 6] = ["bool", "int", "float", "string", "date", "uuid"];
