use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::properties::*;
use crate::document::{DetachedFormat, DocumentFormat, EnvelopeFormat};
use crate::error::SignServerError;
use crate::signing::SUPPORTED_ALGORITHMS;

/// Whether a worker type requires, accepts or rejects a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
    /// Any non-blank value is a fatal error.
    Unsupported,
}

/// Shape a property value must have when it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Any,
    OneOf(&'static [&'static str]),
    NonNegativeInteger,
    DistinguishedName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub requirement: Requirement,
    pub constraint: Constraint,
}

impl PropertySpec {
    const fn new(name: &'static str, requirement: Requirement, constraint: Constraint) -> Self {
        Self { name, requirement, constraint }
    }
}

/// Static property table of a worker type.
///
/// The order of `properties` is the order validation reports errors in.
#[derive(Debug, PartialEq, Eq)]
pub struct WorkerCapabilities {
    properties: &'static [PropertySpec],
}

impl WorkerCapabilities {
    pub fn properties(&self) -> &'static [PropertySpec] {
        self.properties
    }

    pub fn spec(&self, name: &str) -> Option<&'static PropertySpec> {
        self.properties
            .iter()
            .find(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    pub fn supports(&self, name: &str) -> bool {
        self.spec(name)
            .is_some_and(|spec| spec.requirement != Requirement::Unsupported)
    }

    pub fn supports_certificate_levels(&self) -> bool {
        self.supports(INCLUDE_CERTIFICATE_LEVELS)
    }
}

const COMMON_PROPERTIES: [PropertySpec; 3] = [
    PropertySpec::new(SIGNING_ALGORITHM, Requirement::Optional, Constraint::OneOf(SUPPORTED_ALGORITHMS)),
    PropertySpec::new(KEY_SEED, Requirement::Required, Constraint::Any),
    PropertySpec::new(CERTIFICATE_SUBJECT, Requirement::Optional, Constraint::DistinguishedName),
];

static DOCUMENT_SIGNER: WorkerCapabilities = WorkerCapabilities {
    properties: &[
        COMMON_PROPERTIES[0],
        COMMON_PROPERTIES[1],
        COMMON_PROPERTIES[2],
        PropertySpec::new(INCLUDE_CERTIFICATE_LEVELS, Requirement::Unsupported, Constraint::Any),
    ],
};

static DETACHED_SIGNER: WorkerCapabilities = WorkerCapabilities {
    properties: &[
        COMMON_PROPERTIES[0],
        COMMON_PROPERTIES[1],
        COMMON_PROPERTIES[2],
        PropertySpec::new(INCLUDE_CERTIFICATE_LEVELS, Requirement::Optional, Constraint::NonNegativeInteger),
    ],
};

/// The closed set of worker implementations the engine can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerType {
    /// Embeds the signature in an envelope around the document.
    /// Certificate levels are not supported.
    DocumentSigner,
    /// Returns a detached signature over the document.
    DetachedSigner,
}

impl WorkerType {
    pub const ALL: [WorkerType; 2] = [WorkerType::DocumentSigner, WorkerType::DetachedSigner];

    pub fn capabilities(self) -> &'static WorkerCapabilities {
        match self {
            Self::DocumentSigner => &DOCUMENT_SIGNER,
            Self::DetachedSigner => &DETACHED_SIGNER,
        }
    }

    pub fn document_format(self) -> &'static dyn DocumentFormat {
        match self {
            Self::DocumentSigner => &EnvelopeFormat,
            Self::DetachedSigner => &DetachedFormat,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DocumentSigner => "document-signer",
            Self::DetachedSigner => "detached-signer",
        }
    }
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for WorkerType {
    type Err = SignServerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|worker_type| worker_type.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SignServerError::InvalidRequest(format!("unknown worker type: {s}")))
    }
}
