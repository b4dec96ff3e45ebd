//! Cache key definitions.
//!
//! `Tag` names an entity (or the collection sentinel) that cached results
//! depend on; `QueryKey` identifies one cached query result.

use std::fmt;

/// Kind of entity a tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Product,
}

/// Identifier half of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagId {
    Id(u64),
    /// Sentinel standing for "any collection view" of the kind.
    List,
}

/// Invalidation unit. Two tags are equal when kind and identifier match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: TagId,
}

impl Tag {
    pub const PRODUCT_LIST: Tag = Tag {
        kind: TagKind::Product,
        id: TagId::List,
    };

    pub fn product(id: u64) -> Self {
        Self {
            kind: TagKind::Product,
            id: TagId::Id(id),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            TagKind::Product => "Product",
        };
        match self.id {
            TagId::Id(id) => write!(f, "{kind}:{id}"),
            TagId::List => write!(f, "{kind}:LIST"),
        }
    }
}

/// Identity of a cached query: endpoint plus arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Products { limit: u32, skip: u32 },
    AllProducts,
    ProductById(u64),
    Categories,
}

impl QueryKey {
    /// Whether a result of this query can provide `tag`, judged from the key
    /// alone. A page may contain any product, so it matches every product tag.
    pub fn may_provide(&self, tag: &Tag) -> bool {
        match self {
            Self::Products { .. } => tag.kind == TagKind::Product,
            Self::AllProducts => *tag == Tag::PRODUCT_LIST,
            Self::ProductById(id) => *tag == Tag::product(*id),
            Self::Categories => false,
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Products { limit, skip } => write!(f, "products(limit={limit},skip={skip})"),
            Self::AllProducts => f.write_str("products(all)"),
            Self::ProductById(id) => write!(f, "product({id})"),
            Self::Categories => f.write_str("categories"),
        }
    }
}
