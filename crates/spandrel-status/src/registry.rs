use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use spandrel_core::TypeName;
use tracing::info;

use crate::error::{StatusError, StatusResult};

/// Upper bound on a flattened lineage. The parent walk stops here, so a
/// cyclic or absurdly deep declaration terminates with a truncated chain.
const MAX_LINEAGE_DEPTH: usize = 64;

/// Upper bound on an accepted registry manifest, in bytes.
const MAX_MANIFEST_BYTES: usize = 1024 * 1024;

// ---------------------------------------------------------------------------
// ExceptionRegistry — explicit type metadata, built once at startup
//
// Stands in for runtime reflection: each declared concrete type maps to
// its flattened ancestor chain, and marker membership records the types
// declared always-ignorable. Lookups on undeclared types degrade to
// "no ancestors, no marker" rather than failing.
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ExceptionRegistry {
    ancestors: HashMap<TypeName, Vec<TypeName>>,
    ignored_markers: HashSet<TypeName>,
}

impl ExceptionRegistry {
    /// A registry with no declared types. Exact-name ignore-list matches
    /// still work against it; subtype and marker matches never do.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> ExceptionRegistryBuilder {
        ExceptionRegistryBuilder::default()
    }

    /// Whether `concrete` is `base` or a transitive subtype of it.
    pub fn is_assignable_to(&self, concrete: &TypeName, base: &TypeName) -> bool {
        if concrete == base {
            return true;
        }
        self.ancestors
            .get(concrete)
            .map_or(false, |chain| chain.contains(base))
    }

    /// Whether `concrete` itself was declared with the ignored marker.
    /// The marker is a property of the declaring type and is never
    /// inherited through the lineage.
    pub fn carries_ignored_marker(&self, concrete: &TypeName) -> bool {
        self.ignored_markers.contains(concrete)
    }

    /// Flattened ancestor chain of `concrete`, nearest first. Empty for
    /// undeclared types.
    pub fn ancestors_of(&self, concrete: &TypeName) -> &[TypeName] {
        self.ancestors
            .get(concrete)
            .map_or(&[], |chain| chain.as_slice())
    }

    pub fn declared_type_count(&self) -> usize {
        self.ancestors.len()
    }

    /// Load a registry from raw JSON manifest bytes.
    pub fn from_json(manifest_data: &[u8]) -> StatusResult<Self> {
        if manifest_data.is_empty() {
            return Err(StatusError::RegistryLoad(
                "registry manifest is empty".to_string(),
            ));
        }
        if manifest_data.len() > MAX_MANIFEST_BYTES {
            return Err(StatusError::RegistryLoad(format!(
                "registry manifest exceeds {} byte size limit",
                MAX_MANIFEST_BYTES
            )));
        }

        let json_str = std::str::from_utf8(manifest_data).map_err(|_| {
            StatusError::RegistryLoad("registry manifest is not valid UTF-8".to_string())
        })?;

        let manifest: RegistryManifest = serde_json::from_str(json_str)
            .map_err(|e| StatusError::RegistryDeserialization(format!("JSON parse error: {}", e)))?;

        manifest.validate()?;

        let mut builder = ExceptionRegistry::builder();
        for decl in &manifest.types {
            builder = match &decl.extends {
                Some(parent) => builder.register_subtype(decl.name.clone(), parent.clone()),
                None => builder.register_type(decl.name.clone()),
            };
            if decl.ignored_marker {
                builder = builder.mark_ignored(decl.name.clone());
            }
        }
        let registry = builder.build();

        info!(
            declared_types = registry.declared_type_count(),
            marked_types = registry.ignored_markers.len(),
            "exception registry loaded"
        );
        Ok(registry)
    }
}

// ---------------------------------------------------------------------------
// ExceptionRegistryBuilder — flattening and cycle defense
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ExceptionRegistryBuilder {
    parents: HashMap<TypeName, Option<TypeName>>,
    markers: HashSet<TypeName>,
}

impl ExceptionRegistryBuilder {
    /// Declare a type with no parent. Redeclaring a type overwrites its
    /// previous parent link.
    pub fn register_type(mut self, name: impl Into<TypeName>) -> Self {
        self.parents.insert(name.into(), None);
        self
    }

    /// Declare a type extending `parent`. The parent itself need not be
    /// declared; an undeclared parent simply terminates the lineage.
    pub fn register_subtype(
        mut self,
        name: impl Into<TypeName>,
        parent: impl Into<TypeName>,
    ) -> Self {
        self.parents.insert(name.into(), Some(parent.into()));
        self
    }

    /// Attach the ignored marker to `name`. Marker membership is
    /// independent of lineage declaration.
    pub fn mark_ignored(mut self, name: impl Into<TypeName>) -> Self {
        self.markers.insert(name.into());
        self
    }

    /// Flatten parent links into full ancestor chains. Infallible: a
    /// cyclic declaration yields a chain truncated at the first repeat.
    pub fn build(self) -> ExceptionRegistry {
        let mut ancestors = HashMap::with_capacity(self.parents.len());
        for name in self.parents.keys() {
            let mut chain: Vec<TypeName> = Vec::new();
            let mut seen: HashSet<&TypeName> = HashSet::new();
            seen.insert(name);
            let mut current = self.parents.get(name).and_then(|p| p.as_ref());
            while let Some(parent) = current {
                if chain.len() >= MAX_LINEAGE_DEPTH || !seen.insert(parent) {
                    break;
                }
                chain.push(parent.clone());
                current = self.parents.get(parent).and_then(|p| p.as_ref());
            }
            ancestors.insert(name.clone(), chain);
        }
        ExceptionRegistry {
            ancestors,
            ignored_markers: self.markers,
        }
    }
}

// ---------------------------------------------------------------------------
// RegistryManifest — serialized registry declaration
// ---------------------------------------------------------------------------

/// Serialized form of the registry: a flat list of type declarations.
/// Loaded once at startup, typically from a file next to the agent config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryManifest {
    pub schema_version: u32,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
}

/// One declared exception type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDeclaration {
    pub name: TypeName,
    #[serde(default)]
    pub extends: Option<TypeName>,
    #[serde(default)]
    pub ignored_marker: bool,
}

impl RegistryManifest {
    /// Structural validation: supported schema version, non-empty unique
    /// names, no self-extension.
    pub fn validate(&self) -> StatusResult<()> {
        let mut errors = Vec::new();

        if self.schema_version != 1 {
            errors.push(format!(
                "unsupported schema version: {} (only version 1 is supported)",
                self.schema_version
            ));
        }

        let mut seen_names = HashSet::new();
        for decl in &self.types {
            if decl.name.as_str().is_empty() {
                errors.push("type name must not be empty".to_string());
            } else if !seen_names.insert(&decl.name) {
                errors.push(format!("duplicate type name: '{}'", decl.name));
            }
            if let Some(parent) = &decl.extends {
                if parent == &decl.name {
                    errors.push(format!("type '{}' must not extend itself", decl.name));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StatusError::Validation(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_registry() -> ExceptionRegistry {
        ExceptionRegistry::builder()
            .register_type("pkg.BaseException")
            .register_subtype("pkg.NamedMatchException", "pkg.BaseException")
            .register_subtype("pkg.InheritedMatchException", "pkg.NamedMatchException")
            .mark_ignored("pkg.AnnotationMarkedException")
            .build()
    }

    #[test]
    fn test_exact_type_is_assignable_to_itself() {
        let registry = make_registry();
        let name = TypeName::new("pkg.NamedMatchException");
        assert!(registry.is_assignable_to(&name, &name));
    }

    #[test]
    fn test_undeclared_type_matches_itself_only() {
        let registry = ExceptionRegistry::empty();
        let name = TypeName::new("pkg.Unknown");
        assert!(registry.is_assignable_to(&name, &name));
        assert!(!registry.is_assignable_to(&name, &TypeName::new("pkg.Other")));
        assert!(registry.ancestors_of(&name).is_empty());
    }

    #[test]
    fn test_direct_subtype_assignable() {
        let registry = make_registry();
        assert!(registry.is_assignable_to(
            &TypeName::new("pkg.NamedMatchException"),
            &TypeName::new("pkg.BaseException")
        ));
    }

    #[test]
    fn test_transitive_subtype_assignable() {
        let registry = make_registry();
        assert!(registry.is_assignable_to(
            &TypeName::new("pkg.InheritedMatchException"),
            &TypeName::new("pkg.BaseException")
        ));
    }

    #[test]
    fn test_assignability_is_directional() {
        let registry = make_registry();
        assert!(!registry.is_assignable_to(
            &TypeName::new("pkg.BaseException"),
            &TypeName::new("pkg.NamedMatchException")
        ));
    }

    #[test]
    fn test_marker_on_concrete_type_only() {
        let registry = ExceptionRegistry::builder()
            .register_subtype("pkg.Child", "pkg.MarkedParent")
            .mark_ignored("pkg.MarkedParent")
            .build();
        assert!(registry.carries_ignored_marker(&TypeName::new("pkg.MarkedParent")));
        // Not inherited: the child's lineage includes the marked parent,
        // but the marker lookup is on the concrete type.
        assert!(!registry.carries_ignored_marker(&TypeName::new("pkg.Child")));
    }

    #[test]
    fn test_undeclared_parent_terminates_lineage() {
        let registry = ExceptionRegistry::builder()
            .register_subtype("pkg.Child", "ext.UndeclaredParent")
            .build();
        assert_eq!(
            registry.ancestors_of(&TypeName::new("pkg.Child")),
            [TypeName::new("ext.UndeclaredParent")]
        );
        assert!(registry.is_assignable_to(
            &TypeName::new("pkg.Child"),
            &TypeName::new("ext.UndeclaredParent")
        ));
    }

    #[test]
    fn test_cyclic_declaration_terminates() {
        let registry = ExceptionRegistry::builder()
            .register_subtype("pkg.A", "pkg.B")
            .register_subtype("pkg.B", "pkg.A")
            .build();
        // Both chains are finite and each type still reaches the other.
        assert!(registry.is_assignable_to(&TypeName::new("pkg.A"), &TypeName::new("pkg.B")));
        assert!(registry.is_assignable_to(&TypeName::new("pkg.B"), &TypeName::new("pkg.A")));
        assert!(registry.ancestors_of(&TypeName::new("pkg.A")).len() <= 2);
    }

    #[test]
    fn test_deep_lineage_is_bounded() {
        let mut builder = ExceptionRegistry::builder();
        for i in 0..200u32 {
            builder = builder.register_subtype(format!("pkg.T{}", i), format!("pkg.T{}", i + 1));
        }
        let registry = builder.build();
        assert!(registry.ancestors_of(&TypeName::new("pkg.T0")).len() <= MAX_LINEAGE_DEPTH);
    }

    #[test]
    fn test_redeclaration_overwrites_parent() {
        let registry = ExceptionRegistry::builder()
            .register_subtype("pkg.X", "pkg.OldParent")
            .register_subtype("pkg.X", "pkg.NewParent")
            .build();
        assert!(registry.is_assignable_to(&TypeName::new("pkg.X"), &TypeName::new("pkg.NewParent")));
        assert!(!registry.is_assignable_to(&TypeName::new("pkg.X"), &TypeName::new("pkg.OldParent")));
    }

    #[test]
    fn test_from_json_valid_manifest() {
        let json = r#"{
            "schema_version": 1,
            "types": [
                {"name": "pkg.BaseException"},
                {"name": "pkg.NamedMatchException", "extends": "pkg.BaseException"},
                {"name": "pkg.AnnotationMarkedException", "ignored_marker": true}
            ]
        }"#;
        let registry = ExceptionRegistry::from_json(json.as_bytes()).unwrap();
        assert_eq!(registry.declared_type_count(), 3);
        assert!(registry.is_assignable_to(
            &TypeName::new("pkg.NamedMatchException"),
            &TypeName::new("pkg.BaseException")
        ));
        assert!(registry.carries_ignored_marker(&TypeName::new("pkg.AnnotationMarkedException")));
    }

    #[test]
    fn test_from_json_empty_input() {
        let result = ExceptionRegistry::from_json(&[]);
        assert!(matches!(result.unwrap_err(), StatusError::RegistryLoad(_)));
    }

    #[test]
    fn test_from_json_invalid_utf8() {
        let result = ExceptionRegistry::from_json(&[0xFF, 0xFE]);
        assert!(matches!(result.unwrap_err(), StatusError::RegistryLoad(_)));
    }

    #[test]
    fn test_from_json_invalid_json() {
        let result = ExceptionRegistry::from_json(b"not json");
        assert!(matches!(
            result.unwrap_err(),
            StatusError::RegistryDeserialization(_)
        ));
    }

    #[test]
    fn test_from_json_bad_schema_version() {
        let json = r#"{"schema_version": 2, "types": []}"#;
        let result = ExceptionRegistry::from_json(json.as_bytes());
        assert!(matches!(result.unwrap_err(), StatusError::Validation(_)));
    }

    #[test]
    fn test_manifest_validate_duplicate_names() {
        let manifest = RegistryManifest {
            schema_version: 1,
            types: vec![
                TypeDeclaration {
                    name: TypeName::new("pkg.A"),
                    extends: None,
                    ignored_marker: false,
                },
                TypeDeclaration {
                    name: TypeName::new("pkg.A"),
                    extends: None,
                    ignored_marker: true,
                },
            ],
        };
        let err = manifest.validate().unwrap_err();
        assert!(format!("{}", err).contains("duplicate"));
    }

    #[test]
    fn test_manifest_validate_self_extension() {
        let manifest = RegistryManifest {
            schema_version: 1,
            types: vec![TypeDeclaration {
                name: TypeName::new("pkg.A"),
                extends: Some(TypeName::new("pkg.A")),
                ignored_marker: false,
            }],
        };
        let err = manifest.validate().unwrap_err();
        assert!(format!("{}", err).contains("extend itself"));
    }

    #[test]
    fn test_manifest_serde_roundtrip() {
        let manifest = RegistryManifest {
            schema_version: 1,
            types: vec![TypeDeclaration {
                name: TypeName::new("pkg.TimeoutException"),
                extends: Some(TypeName::new("pkg.BaseException")),
                ignored_marker: false,
            }],
        };
        let json = serde_json::to_string(&manifest).unwrap();
        let restored: RegistryManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.schema_version, 1);
        assert_eq!(restored.types.len(), 1);
        assert_eq!(restored.types[0].name, TypeName::new("pkg.TimeoutException"));
    }
}
