#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Tri-state value for an optional model field.
///
/// Every optional field is in exactly one of three states: the caller never
/// supplied it ([`Field::Absent`]), the caller supplied an explicit JSON null
/// ([`Field::Null`]), or the caller supplied a real value ([`Field::Value`]).
/// Absent fields are omitted from wire payloads entirely; null fields are
/// emitted as JSON `null`.
///
/// This is a first-class enum rather than `Option<Option<T>>` so the three
/// states can never collapse into each other.
pub enum Field<T> {
    /// The field was never supplied.
    Absent,
    /// The field was explicitly set to null.
    Null,
    /// The field holds a value.
    Value(T),
}

// Manual impl: `Absent` is the default for any `T`, no `T: Default` needed.
impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Field<T> {
    /// Returns `false` iff the field was never supplied.
    pub fn is_given(&self) -> bool {
        !matches!(self, Self::Absent)
    }

    /// Returns `true` iff the field was never supplied.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `true` iff the field was explicitly set to null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` iff the field holds a value.
    pub fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Take the value, if any. Null and Absent both yield `None`.
    ///
    /// Borrow first with [`Field::as_ref`] to keep the field intact.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Absent | Self::Null => None,
        }
    }

    /// Convert `&Field<T>` to `Field<&T>`.
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Absent => Field::Absent,
            Self::Null => Field::Null,
            Self::Value(value) => Field::Value(value),
        }
    }

    /// Map the contained value, preserving Absent/Null.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Absent => Field::Absent,
            Self::Null => Field::Null,
            Self::Value(value) => Field::Value(f(value)),
        }
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Self::Value(value)
    }
}
