//! Lazy associations between resource classes.
//!
//! | Piece | Lifetime | Role |
//! |---|---|---|
//! | [`AssociationDeclaration`] | class-wide, immutable | target, path, default, cardinality |
//! | [`AssociationProxy`] | per record and name | pending filters, cached result |
//!
//! Reading an association never fetches eagerly. [`AssociationProxy::fetch`]
//! resolves, in order: the declared default (if the owner's slot holds it),
//! the proxy's cache, data the owner already holds inline, and only then a
//! `GET` on `<owner path><association path>`.

mod declaration;
mod has_many;
mod proxy;

pub use declaration::{AssociationDeclaration, AssociationOptions, Cardinality};
pub use proxy::AssociationProxy;
pub(crate) use proxy::ProxyState;
