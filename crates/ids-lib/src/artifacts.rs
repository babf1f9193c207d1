//! Loading of the trained artifacts
//!
//! An artifact directory holds a `manifest.json` naming the feature schema,
//! the fitted transform and the classifier, plus optional SHA256 checksums
//! that are validated before anything is parsed. Artifacts are read once at
//! startup and never mutated afterwards.

use crate::error::ArtifactError;
use crate::predictor::{
    Classifier, IdentityTransform, IntrusionDetector, LinearClassifier, OnnxClassifier,
    ReconcilePolicy, StandardScaler, Transform,
};
use crate::schema::FeatureSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name of the manifest inside an artifact directory
pub const MANIFEST_FILE: &str = "manifest.json";

/// Description of an artifact directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    /// Version label of the training run
    #[serde(default = "default_version")]
    pub version: String,
    /// Schema file, a JSON array of feature names
    #[serde(default = "default_schema_file")]
    pub schema: String,
    pub transform: TransformSpec,
    pub classifier: ClassifierSpec,
    /// Expected SHA256 (hex) per file name
    #[serde(default)]
    pub sha256: HashMap<String, String>,
}

impl ArtifactManifest {
    /// Files the manifest refers to, in load order
    pub fn files(&self) -> Vec<&str> {
        let mut files = vec![self.schema.as_str()];
        if let TransformSpec::StandardScaler { path } = &self.transform {
            files.push(path.as_str());
        }
        match &self.classifier {
            ClassifierSpec::Linear { path } | ClassifierSpec::Onnx { path } => {
                files.push(path.as_str())
            }
        }
        files
    }

    /// A non-empty checksum map must cover every file and name nothing else
    fn check_checksum_coverage(&self, dir: &Path) -> Result<(), ArtifactError> {
        if self.sha256.is_empty() {
            return Ok(());
        }

        let files = self.files();
        if let Some(missing) = files.iter().find(|f| !self.sha256.contains_key(**f)) {
            return Err(ArtifactError::MissingChecksum {
                path: dir.join(missing),
            });
        }

        let mut unused: Vec<&String> = self
            .sha256
            .keys()
            .filter(|name| !files.contains(&name.as_str()))
            .collect();
        unused.sort();
        match unused.first() {
            Some(name) => Err(ArtifactError::UnusedChecksum {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

fn default_version() -> String {
    "unversioned".to_string()
}

fn default_schema_file() -> String {
    "schema.json".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    StandardScaler { path: String },
    Identity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    Linear { path: String },
    Onnx { path: String },
}

/// The three loaded artifacts, not yet checked against each other
pub struct ArtifactBundle {
    pub version: String,
    pub schema: FeatureSchema,
    pub transform: Box<dyn Transform>,
    pub classifier: Box<dyn Classifier>,
    /// SHA256 of every file read, keyed by file name
    pub checksums: HashMap<String, String>,
}

impl ArtifactBundle {
    /// Load the artifacts described by `dir/manifest.json`
    pub fn load_dir(dir: &Path) -> Result<Self, ArtifactError> {
        let mut reader = ArtifactReader::new(dir);

        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest_bytes = read_file(&manifest_path)?;
        let manifest: ArtifactManifest =
            serde_json::from_slice(&manifest_bytes).map_err(|source| ArtifactError::Parse {
                path: manifest_path.clone(),
                source,
            })?;
        manifest.check_checksum_coverage(dir)?;
        if manifest.sha256.is_empty() {
            warn!(dir = %dir.display(), "Manifest lists no checksums; artifacts are not verified");
        }
        reader.expected = manifest.sha256.clone();

        let (schema_path, bytes) = reader.read(&manifest.schema)?;
        let schema = FeatureSchema::from_json_slice(&bytes, &schema_path)?;

        let transform: Box<dyn Transform> = match &manifest.transform {
            TransformSpec::StandardScaler { path } => {
                let (path, bytes) = reader.read(path)?;
                Box::new(StandardScaler::from_json_slice(&bytes, &path)?)
            }
            TransformSpec::Identity => Box::new(IdentityTransform),
        };

        let classifier: Box<dyn Classifier> = match &manifest.classifier {
            ClassifierSpec::Linear { path } => {
                let (path, bytes) = reader.read(path)?;
                Box::new(LinearClassifier::from_json_slice(&bytes, &path)?)
            }
            ClassifierSpec::Onnx { path } => {
                let (_, bytes) = reader.read(path)?;
                Box::new(OnnxClassifier::from_bytes(&bytes, schema.len())?)
            }
        };

        info!(
            dir = %dir.display(),
            version = %manifest.version,
            features = schema.len(),
            transform = transform.name(),
            classifier = classifier.name(),
            "Artifacts loaded"
        );

        Ok(Self {
            version: manifest.version,
            schema,
            transform,
            classifier,
            checksums: reader.computed,
        })
    }

    /// Check the artifacts agree and build a detector
    pub fn into_detector(self, policy: ReconcilePolicy) -> Result<IntrusionDetector, ArtifactError> {
        let detector = IntrusionDetector::new(self.schema, self.transform, self.classifier)?
            .with_policy(policy)
            .with_version(self.version);
        Ok(detector)
    }
}

/// Reads files relative to the artifact directory, checking checksums
struct ArtifactReader<'a> {
    dir: &'a Path,
    expected: HashMap<String, String>,
    computed: HashMap<String, String>,
}

impl<'a> ArtifactReader<'a> {
    fn new(dir: &'a Path) -> Self {
        Self {
            dir,
            expected: HashMap::new(),
            computed: HashMap::new(),
        }
    }

    fn read(&mut self, name: &str) -> Result<(PathBuf, Vec<u8>), ArtifactError> {
        let path = self.dir.join(name);
        let bytes = read_file(&path)?;
        let actual = compute_checksum(&bytes);

        if let Some(expected) = self.expected.get(name) {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(ArtifactError::ChecksumMismatch {
                    path,
                    expected: expected.clone(),
                    actual,
                });
            }
            debug!(file = %name, checksum = %actual, "Artifact checksum validated");
        }

        self.computed.insert(name.to_string(), actual);
        Ok((path, bytes))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
