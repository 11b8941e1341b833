//! Type library: descriptors declared in TOML or JSON files.
//!
//! ```toml
//! opaque = ["Matrix"]
//!
//! [records.Name]
//! fields = [
//!     { name = "first", type = "str" },
//!     { name = "middle", type = "Optional[str]" },
//!     { name = "age", type = "int", default = 0 },
//! ]
//!
//! [records.Box]
//! params = ["T"]
//! fields = [{ name = "item", type = "~T" }]
//!
//! [enums.Color]
//! members = ["Red", "Green"]
//! ```
//!
//! Field types are [`TypeExpr`]s. Names resolve to the built-in types first,
//! then to records, enumerations and opaque types of the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use treecodec_core::generics::placeholders;
use treecodec_core::{Dynamic, EnumType, RecordKind, RecordType, TypeDescriptor, deserialize};

use crate::type_expr::TypeExpr;

/// One library document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryFile {
    #[serde(default)]
    pub records: IndexMap<String, RecordDecl>,
    #[serde(default)]
    pub enums: IndexMap<String, EnumDecl>,
    /// Names only convertible through a custom format.
    #[serde(default)]
    pub opaque: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    #[serde(default)]
    pub kind: RecordKind,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    /// Default as a tree, converted against the field type on load.
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub members: EnumMembers,
}

/// Either a list of names, numbered from 1, or a table of name to value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumMembers {
    Names(Vec<String>),
    Values(IndexMap<String, Value>),
}

/// A resolved library entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Record(Arc<RecordType>),
    Enumeration(Arc<EnumType>),
    Opaque,
}

const BUILTIN_NAMES: &[&str] = &[
    "int", "float", "bool", "str", "Any", "NoneType", "Optional", "Union", "Sequence", "List",
    "Set", "Mapping", "Dict", "Tuple",
];

#[derive(Debug, Clone, Default)]
pub struct TypeLibrary {
    definitions: IndexMap<String, Definition>,
}

impl TypeLibrary {
    pub fn from_file(file: LibraryFile) -> crate::Result<Self> {
        Self::from_files([file])
    }

    /// Merge documents and resolve every declaration.
    ///
    /// A name may be declared once across all documents. Recursive record
    /// definitions are rejected.
    pub fn from_files(files: impl IntoIterator<Item = LibraryFile>) -> crate::Result<Self> {
        let merged = merge(files)?;
        let mut builder = Builder {
            file: &merged,
            built: IndexMap::new(),
            in_progress: Vec::new(),
        };
        let names = merged
            .records
            .keys()
            .chain(merged.enums.keys())
            .chain(merged.opaque.iter());
        let mut definitions = IndexMap::new();
        for name in names {
            if let Some(def) = builder.definition(name)? {
                definitions.insert(name.clone(), def);
            }
        }
        debug!(types = definitions.len(), "Built type library");
        Ok(TypeLibrary { definitions })
    }

    /// Load library files and directories of `*.toml` / `*.json` files.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> crate::Result<Self> {
        let mut files = Vec::new();
        for path in paths {
            for file in library_files(path.as_ref())? {
                files.push(read_library_file(&file)?);
            }
        }
        Self::from_files(files)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    /// Declared names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn resolve(&self, expr: &TypeExpr) -> crate::Result<TypeDescriptor> {
        resolve_expr(expr, &mut |name: &str| Ok(self.definitions.get(name).cloned()))
    }

    /// Parse and resolve a type expression such as `Sequence[Name]`.
    pub fn resolve_str(&self, text: &str) -> crate::Result<TypeDescriptor> {
        let expr = TypeExpr::parse(text)?;
        self.resolve(&expr)
            .with_context(|| format!("Failed to resolve type '{text}'"))
    }
}

/// Read one library document; `.json` files are JSON, anything else TOML.
pub fn read_library_file(path: &Path) -> crate::Result<LibraryFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read type library {}", path.display()))?;
    let file = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON type library {}", path.display()))?,
        _ => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML type library {}", path.display()))?,
    };
    debug!(path = %path.display(), "Read type library");
    Ok(file)
}

fn library_files(path: &Path) -> crate::Result<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to list type library directory {}", path.display()))?
    {
        let file = entry?.path();
        if matches!(file.extension().and_then(|e| e.to_str()), Some("toml" | "json")) {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn merge(files: impl IntoIterator<Item = LibraryFile>) -> crate::Result<LibraryFile> {
    let mut merged = LibraryFile::default();
    for file in files {
        let names = file
            .records
            .keys()
            .chain(file.enums.keys())
            .chain(file.opaque.iter());
        for name in names {
            if BUILTIN_NAMES.contains(&name.as_str()) {
                bail!("Type '{name}' shadows a built-in type");
            }
            if merged.records.contains_key(name)
                || merged.enums.contains_key(name)
                || merged.opaque.contains(name)
            {
                bail!("Type '{name}' is defined more than once");
            }
        }
        merged.records.extend(file.records);
        merged.enums.extend(file.enums);
        merged.opaque.extend(file.opaque);
    }
    Ok(merged)
}

struct Builder<'a> {
    file: &'a LibraryFile,
    built: IndexMap<String, Definition>,
    in_progress: Vec<String>,
}

impl<'a> Builder<'a> {
    fn definition(&mut self, name: &str) -> crate::Result<Option<Definition>> {
        if let Some(def) = self.built.get(name) {
            return Ok(Some(def.clone()));
        }
        if self.in_progress.iter().any(|n| n == name) {
            bail!(
                "Recursive type definition: {} -> {name}",
                self.in_progress.join(" -> ")
            );
        }

        let file: &'a LibraryFile = self.file;
        let def = if let Some(decl) = file.records.get(name) {
            self.in_progress.push(name.to_string());
            let record = self.record(name, decl);
            self.in_progress.pop();
            Definition::Record(record?)
        } else if let Some(decl) = file.enums.get(name) {
            Definition::Enumeration(enumeration(name, decl))
        } else if file.opaque.iter().any(|n| n == name) {
            Definition::Opaque
        } else {
            return Ok(None);
        };

        self.built.insert(name.to_string(), def.clone());
        Ok(Some(def))
    }

    fn record(&mut self, name: &str, decl: &RecordDecl) -> crate::Result<Arc<RecordType>> {
        let mut def = match decl.kind {
            RecordKind::Struct => RecordType::new(name),
            RecordKind::NamedTuple => RecordType::named_tuple(name),
        };
        for param in &decl.params {
            def = def.param(param);
        }

        for (i, field) in decl.fields.iter().enumerate() {
            if decl.fields[..i].iter().any(|f| f.name == field.name) {
                bail!("Field '{}' is declared twice in record '{name}'", field.name);
            }
            let ty = resolve_expr(&field.ty, &mut |n: &str| self.definition(n))
                .with_context(|| format!("In field '{}' of record '{name}'", field.name))?;
            if let Some(unknown) = placeholders(&ty)
                .into_iter()
                .find(|p| !decl.params.contains(p))
            {
                bail!(
                    "Field '{}' of record '{name}' uses undeclared placeholder '~{unknown}'",
                    field.name
                );
            }
            let default = match &field.default {
                Some(tree) if !tree.is_null() => Some(deserialize(&ty, tree, None).with_context(
                    || format!("Invalid default for field '{}' of record '{name}'", field.name),
                )?),
                _ => None,
            };
            def = def.field_with_default(&field.name, ty, default);
        }
        Ok(Arc::new(def))
    }
}

fn enumeration(name: &str, decl: &EnumDecl) -> Arc<EnumType> {
    Arc::new(match &decl.members {
        EnumMembers::Names(names) => EnumType::from_names(name, names.iter().cloned()),
        EnumMembers::Values(values) => values
            .iter()
            .fold(EnumType::new(name), |e, (member, value)| {
                e.member(member, Dynamic::from_tree(value))
            }),
    })
}

fn expect_args(name: &str, args: &[TypeDescriptor], count: usize) -> crate::Result<()> {
    if args.len() != count {
        bail!(
            "Type '{name}' takes {count} argument(s), {} given",
            args.len()
        );
    }
    Ok(())
}

fn builtin(name: &str, mut args: Vec<TypeDescriptor>) -> crate::Result<TypeDescriptor> {
    let scalar = match name {
        "int" => Some(TypeDescriptor::integer()),
        "float" => Some(TypeDescriptor::float()),
        "bool" => Some(TypeDescriptor::boolean()),
        "str" => Some(TypeDescriptor::text()),
        "Any" => Some(TypeDescriptor::any()),
        "NoneType" => Some(TypeDescriptor::Absent),
        _ => None,
    };
    if let Some(scalar) = scalar {
        expect_args(name, &args, 0)?;
        return Ok(scalar);
    }

    match name {
        "Union" => {
            if args.is_empty() {
                bail!("Type 'Union' takes at least one argument");
            }
            Ok(TypeDescriptor::union(args)?)
        }
        "Tuple" => Ok(TypeDescriptor::tuple(args)),
        "Optional" | "Sequence" | "List" | "Set" => {
            expect_args(name, &args, 1)?;
            let inner = args.remove(0);
            Ok(match name {
                "Optional" => TypeDescriptor::optional(inner),
                "Set" => TypeDescriptor::set(inner),
                _ => TypeDescriptor::sequence(inner),
            })
        }
        "Mapping" | "Dict" => {
            expect_args(name, &args, 2)?;
            let value = args.remove(1);
            let key = args.remove(0);
            Ok(TypeDescriptor::mapping(key, value))
        }
        _ => bail!("Unknown built-in type '{name}'"),
    }
}

fn resolve_expr<F>(expr: &TypeExpr, named: &mut F) -> crate::Result<TypeDescriptor>
where
    F: FnMut(&str) -> crate::Result<Option<Definition>>,
{
    let (name, args) = match expr {
        TypeExpr::Variable(name) => return Ok(TypeDescriptor::placeholder(name)),
        TypeExpr::Reference(name, args) => (name, args),
    };
    let args = args
        .iter()
        .map(|arg| resolve_expr(arg, named))
        .collect::<crate::Result<Vec<_>>>()?;

    if BUILTIN_NAMES.contains(&name.as_str()) {
        return builtin(name, args);
    }

    match named(name.as_str())? {
        Some(Definition::Record(def)) => {
            if !args.is_empty() && args.len() != def.params().len() {
                bail!(
                    "Record '{name}' declares {} placeholder(s), {} argument(s) given",
                    def.params().len(),
                    args.len()
                );
            }
            Ok(TypeDescriptor::generic(def, args))
        }
        Some(Definition::Enumeration(def)) => {
            expect_args(name, &args, 0)?;
            Ok(TypeDescriptor::enumeration(def))
        }
        Some(Definition::Opaque) => {
            expect_args(name, &args, 0)?;
            Ok(TypeDescriptor::opaque(name.as_str()))
        }
        None => bail!("Unknown type '{name}'"),
    }
}
