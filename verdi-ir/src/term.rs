//! Term kinds and term data.
//!
//! Every node in a term graph is a `TermData`: a kind tag from a closed
//! enumeration, a list of children (indices into the same graph), and an
//! optional payload. The same algebra serves two purposes: the *type*
//! subset denotes sets of values (semantic types), and the *formula*
//! subset denotes verification conditions over symbolic values. Logical
//! connectives (`Union`, `Intersect`, `Not`, `Difference`) are shared by
//! both worlds.

use crate::rational::Rational;
use smallvec::SmallVec;

/// An opaque reference to a term in a [`TermGraph`](crate::TermGraph).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term(u32);
entity_impl!(Term, "t");

/// The closed enumeration of term kinds.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum TermKind {
    // Primitive type leaves.
    /// The uninhabited type.
    Void,
    /// The type of all values.
    Any,
    /// The type containing exactly the null value.
    Null,
    /// The boolean type.
    Bool,
    /// The unbounded integer type.
    Int,
    /// The rational (real) type.
    Real,
    /// The string type.
    Str,

    // Type constructors.
    /// An array type; one child, the element type.
    Array,
    /// A set type; one child, the element type.
    Set,
    /// A list type; one child, the element type.
    List,
    /// A record type; children are field types, payload carries the sorted
    /// field names and the open/closed flag.
    Record,
    /// A tuple type; children are the component types.
    Tuple,
    /// A reference type; one child (the referent type), payload carries the
    /// lifetime identifier.
    Ref,
    /// A function type; children are the parameter types followed by the
    /// return type.
    Func,
    /// A method type; same layout as `Func`.
    Method,
    /// A property type; one child, the subject type.
    Property,
    /// A named (nominal) type; no children, payload carries the qualified
    /// name. Unfolded on demand through the name resolver.
    Nominal,

    // Logical connectives, shared between types and formulas.
    /// Complement of a type, or negation of a formula; one child.
    Not,
    /// Union of types, or disjunction of formulas; n children.
    Union,
    /// Intersection of types, or conjunction of formulas; n children.
    Intersect,
    /// Type difference `A \ B`; two children. Eliminated by rewriting.
    Difference,

    // Value leaves.
    /// A numeric constant; payload carries the rational.
    NumVal,
    /// A string constant; payload carries the text.
    StrVal,
    /// A boolean constant; payload carries the bit.
    BoolVal,
    /// The null constant.
    NullVal,

    // Aggregate values.
    /// A list value; children are the elements in order.
    ListVal,
    /// A set value; children are the canonically ordered, distinct elements.
    SetVal,
    /// A record value; children are field values, payload as for `Record`.
    RecordVal,
    /// A tuple value; children are the components in order.
    TupleVal,

    // Constructors of the verification-condition algebra.
    /// Polynomial sum: children are the constant bias followed by a `Bag`
    /// of monomials.
    Sum,
    /// Polynomial monomial: children are the constant coefficient followed
    /// by a `Bag` of atoms.
    Mul,
    /// Division; two children, dividend and divisor.
    Div,
    /// An unordered collection of children (multiset), used by `Sum`/`Mul`.
    Bag,
    /// Equality of two terms.
    Equals,
    /// Strict less-than over numeric terms.
    LessThan,
    /// Membership of a value in a collection or in a semantic type.
    ElementOf,
    /// Subset relation between two set terms.
    SubsetOf,
    /// Field projection from a record term; payload carries the field name.
    FieldOf,
    /// Functional record update; children are the record and the new field
    /// value, payload carries the field name.
    FieldUpdate,
    /// Indexing into a list term; two children, list and index.
    IndexOf,
    /// Functional list update; three children: list, index, new element.
    ListUpdate,
    /// Length of a list term; one child.
    LengthOf,
    /// Projection from a tuple term; payload carries the component index.
    TupleLoad,
    /// A symbolic variable; payload carries the name.
    Var,
}

impl TermKind {
    /// Is this kind a primitive type leaf?
    pub fn is_type_leaf(self) -> bool {
        use TermKind::*;
        matches!(self, Void | Any | Null | Bool | Int | Real | Str)
    }

    /// Is this kind a structural type constructor?
    pub fn is_type_constructor(self) -> bool {
        use TermKind::*;
        matches!(
            self,
            Array | Set | List | Record | Tuple | Ref | Func | Method | Property
        )
    }

    /// Is this kind part of the type algebra (leaf, constructor or nominal)?
    pub fn is_type(self) -> bool {
        self.is_type_leaf() || self.is_type_constructor() || self == TermKind::Nominal
    }

    /// Is this kind a logical connective?
    pub fn is_connective(self) -> bool {
        use TermKind::*;
        matches!(self, Not | Union | Intersect | Difference)
    }

    /// Is this kind a value leaf?
    pub fn is_value_leaf(self) -> bool {
        use TermKind::*;
        matches!(self, NumVal | StrVal | BoolVal | NullVal)
    }

    /// Is this kind an aggregate value constructor?
    pub fn is_aggregate_value(self) -> bool {
        use TermKind::*;
        matches!(self, ListVal | SetVal | RecordVal | TupleVal)
    }

    /// Do terms of this kind ignore the order of their children?
    ///
    /// Children of these kinds are sorted by index during canonicalization;
    /// `Union`, `Intersect` and `SetVal` additionally deduplicate.
    pub fn is_unordered(self) -> bool {
        use TermKind::*;
        matches!(self, Union | Intersect | SetVal | Bag)
    }

    /// Is this kind an atom of the formula algebra?
    pub fn is_predicate(self) -> bool {
        use TermKind::*;
        matches!(self, Equals | LessThan | ElementOf | SubsetOf | Var | BoolVal)
    }
}

/// Out-of-band data attached to a term.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Payload {
    /// A name: variable, field projection, or lifetime identifier.
    Name(String),
    /// A rational constant.
    Num(Rational),
    /// A string constant.
    Str(String),
    /// A boolean constant.
    Bool(bool),
    /// Record field names (sorted, parallel to the children) plus the
    /// open/closed flag.
    Fields {
        /// The sorted field names.
        names: Vec<String>,
        /// Whether the record admits additional unspecified fields.
        open: bool,
    },
    /// The qualified name of a nominal type.
    Nominal(String),
}

/// A term: kind, children, optional payload, and the `deterministic` flag
/// set once the children are in canonical order.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TermData {
    /// The kind tag.
    pub kind: TermKind,
    /// Children, as indices into the owning graph.
    pub children: SmallVec<[Term; 4]>,
    /// Optional out-of-band payload.
    pub payload: Option<Payload>,
    /// True once the children are canonically ordered; only deterministic
    /// terms are hash-consed.
    pub deterministic: bool,
}

impl TermData {
    /// A childless, payload-free term of the given kind.
    pub fn leaf(kind: TermKind) -> Self {
        TermData {
            kind,
            children: SmallVec::new(),
            payload: None,
            deterministic: true,
        }
    }

    /// A term with children and no payload. Marked deterministic only when
    /// the kind is order-sensitive (ordered children are canonical as
    /// given); unordered kinds become deterministic after canonicalization.
    pub fn node(kind: TermKind, children: impl IntoIterator<Item = Term>) -> Self {
        TermData {
            kind,
            children: children.into_iter().collect(),
            payload: None,
            deterministic: !kind.is_unordered(),
        }
    }

    /// A term with children and a payload.
    pub fn with_payload(
        kind: TermKind,
        children: impl IntoIterator<Item = Term>,
        payload: Payload,
    ) -> Self {
        TermData {
            kind,
            children: children.into_iter().collect(),
            payload: Some(payload),
            deterministic: !kind.is_unordered(),
        }
    }

    /// The record field names and open flag, when this is a record type or
    /// record value.
    pub fn fields(&self) -> Option<(&[String], bool)> {
        match self.payload {
            Some(Payload::Fields { ref names, open }) => Some((names, open)),
            _ => None,
        }
    }

    /// The rational payload, when present.
    pub fn num(&self) -> Option<Rational> {
        match self.payload {
            Some(Payload::Num(r)) => Some(r),
            _ => None,
        }
    }

    /// The name payload, when present.
    pub fn name(&self) -> Option<&str> {
        match self.payload {
            Some(Payload::Name(ref n)) => Some(n),
            Some(Payload::Nominal(ref n)) => Some(n),
            _ => None,
        }
    }

    /// The boolean payload, when present.
    pub fn bool_val(&self) -> Option<bool> {
        match self.payload {
            Some(Payload::Bool(b)) => Some(b),
            _ => None,
        }
    }
}
