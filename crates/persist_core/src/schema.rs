//! Attribute schema.
//!
//! A schema is the ordered list of attributes an entity carries. Each
//! attribute has a [`Role`] deciding whether it is part of the primary key
//! ([`Role::Identity`]), stored alongside it ([`Role::Persistent`]) or kept
//! in memory only ([`Role::Transient`]).

use crate::error::{CoreError, CoreResult};
use persist_codec::Datatype;
use persist_storage::RecordLayout;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How an attribute takes part in persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Part of the primary key; stored.
    Identity,
    /// Stored, not part of the key.
    Persistent,
    /// Never stored.
    Transient,
}

impl Role {
    /// Whether attributes of this role are written to the store.
    #[must_use]
    pub fn is_persisted(self) -> bool {
        !matches!(self, Role::Transient)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Identity => f.write_str("Identity"),
            Role::Persistent => f.write_str("Persistent"),
            Role::Transient => f.write_str("Transient"),
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" | "identity" => Ok(Role::Identity),
            "persistent" => Ok(Role::Persistent),
            "transient" => Ok(Role::Transient),
            other => Err(CoreError::schema(format!("unknown attribute role: {other}"))),
        }
    }
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    /// Attribute name, unique and case-sensitive within a schema.
    pub name: String,
    /// Persistence role.
    pub role: Role,
    /// Datatype with its constructor arguments.
    pub datatype: Datatype,
}

impl AttributeDescriptor {
    /// Creates a descriptor.
    pub fn new(name: impl Into<String>, role: Role, datatype: Datatype) -> Self {
        Self {
            name: name.into(),
            role,
            datatype,
        }
    }
}

/// Ordered attribute declarations with lookup by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    attributes: Vec<AttributeDescriptor>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a schema from descriptors, in order.
    ///
    /// # Errors
    ///
    /// Returns a schema error on the first empty or duplicate name.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = AttributeDescriptor>,
    ) -> CoreResult<Self> {
        let mut schema = Self::new();
        for descriptor in descriptors {
            schema.push(descriptor)?;
        }
        Ok(schema)
    }

    /// Appends an attribute.
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name is empty or already declared.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        role: Role,
        datatype: Datatype,
    ) -> CoreResult<()> {
        self.push(AttributeDescriptor::new(name, role, datatype))
    }

    /// Appends an attribute whose role and datatype are given by name.
    ///
    /// `role` is one of `ID`/`Identity`, `Persistent`, `Transient`;
    /// `datatype` and `args` are resolved by [`Datatype::from_name`].
    ///
    /// # Errors
    ///
    /// Returns a schema error if the name is taken or the role, datatype or
    /// arguments are not recognized.
    pub fn add_attribute_named(
        &mut self,
        name: &str,
        role: &str,
        datatype: &str,
        args: &[u32],
    ) -> CoreResult<()> {
        let role = role.parse::<Role>()?;
        let datatype = Datatype::from_name(datatype, args)
            .map_err(|e| CoreError::schema(format!("attribute `{name}`: {e}")))?;
        self.add_attribute(name, role, datatype)
    }

    fn push(&mut self, descriptor: AttributeDescriptor) -> CoreResult<()> {
        if descriptor.name.is_empty() {
            return Err(CoreError::schema("attribute name must not be empty"));
        }
        if self.by_name.contains_key(&descriptor.name) {
            return Err(CoreError::schema(format!(
                "attribute `{}` already declared",
                descriptor.name
            )));
        }
        self.by_name
            .insert(descriptor.name.clone(), self.attributes.len());
        self.attributes.push(descriptor);
        Ok(())
    }

    /// Attributes with the given role, in declaration order.
    #[must_use]
    pub fn attributes_of(&self, role: Role) -> Vec<&AttributeDescriptor> {
        self.attributes.iter().filter(|a| a.role == role).collect()
    }

    /// Identity attributes, in declaration order.
    #[must_use]
    pub fn identity(&self) -> Vec<&AttributeDescriptor> {
        self.attributes_of(Role::Identity)
    }

    /// Identity and persistent attributes, in declaration order.
    #[must_use]
    pub fn persisted(&self) -> Vec<&AttributeDescriptor> {
        self.attributes
            .iter()
            .filter(|a| a.role.is_persisted())
            .collect()
    }

    /// Looks up an attribute by name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.position(name).map(|i| &self.attributes[i])
    }

    /// Declaration index of an attribute.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Looks up an attribute by name, failing with a schema error.
    ///
    /// # Errors
    ///
    /// Returns a schema error if no such attribute is declared.
    pub fn require(&self, name: &str) -> CoreResult<(usize, &AttributeDescriptor)> {
        self.position(name)
            .map(|i| (i, &self.attributes[i]))
            .ok_or_else(|| CoreError::schema(format!("unknown attribute `{name}`")))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no attributes are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterates over the attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.iter()
    }

    /// Whether at least one identity attribute is declared.
    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.attributes.iter().any(|a| a.role == Role::Identity)
    }

    /// The stored row shape: persisted attributes, keyed by the identity
    /// attributes' positions within that row.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if there is no identity attribute.
    pub fn layout(&self) -> CoreResult<RecordLayout> {
        let persisted = self.persisted();
        let key_columns: Vec<usize> = persisted
            .iter()
            .enumerate()
            .filter(|(_, a)| a.role == Role::Identity)
            .map(|(i, _)| i)
            .collect();
        if key_columns.is_empty() {
            return Err(CoreError::config(
                "schema declares no identity attribute",
            ));
        }
        RecordLayout::new(key_columns, persisted.len()).map_err(CoreError::from)
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a AttributeDescriptor;
    type IntoIter = std::slice::Iter<'a, AttributeDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.attributes.iter()
    }
}
