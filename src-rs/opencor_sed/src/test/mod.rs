//! Test doubles and models used by the tests
//!
//! The doubles stand in for the collaborators of a [`FileRegistry`] and for
//! model analysis, so that document construction can be tested for every
//! model class without writing a model of each class.

use std::sync::Arc;

use opencor_file::{ArchiveEntry, ArchiveError, ArchiveReader, FileRegistry, HttpClient, HttpError};
use opencor_model::{AnalysedModel, ModelAnalyser, ModelClass};
use opencor_shared::issue::Logger;

/// An HTTP client without network: every request fails with a 404 status.
#[derive(Debug, Default)]
pub struct TestHttpClient;

impl HttpClient for TestHttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        Err(HttpError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// An archive reader serving canned entries for any archive.
#[derive(Debug, Default)]
pub struct TestArchiveReader {
    entries: Vec<(ArchiveEntry, Vec<u8>)>,
}

impl TestArchiveReader {
    /// Adds an entry
    pub fn with_entry(mut self, location: &str, contents: &str, master: bool) -> Self {
        let entry = ArchiveEntry {
            location: location.to_string(),
            format: String::new(),
            master,
        };

        self.entries.push((entry, contents.as_bytes().to_vec()));
        self
    }
}

impl ArchiveReader for TestArchiveReader {
    fn read_manifest(&self, _archive: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        Ok(self.entries.iter().map(|(entry, _)| entry.clone()).collect())
    }

    fn read_entry(&self, _archive: &[u8], location: &str) -> Result<Vec<u8>, ArchiveError> {
        self.entries
            .iter()
            .find(|(entry, _)| entry.location == location)
            .map(|(_, contents)| contents.clone())
            .ok_or_else(|| ArchiveError::MissingEntry(location.to_string()))
    }
}

/// Bytes that are recognised as a ZIP container
pub const ARCHIVE_BYTES: &[u8] = b"PK\x03\x04 test archive";

/// A model analyser reporting the same class for every model, without any
/// equation.
#[derive(Debug, Clone, Copy)]
pub struct TestModelAnalyser(pub ModelClass);

impl ModelAnalyser for TestModelAnalyser {
    fn analyse(&self, _contents: &[u8]) -> AnalysedModel {
        let mut logger = Logger::new();

        if !self.0.is_valid() {
            logger.add_error(format!("The model is {}.", self.0));
        }

        AnalysedModel::without_equations(self.0, logger)
    }
}

/// Creates a registry without network, reading archives with `archive`.
pub fn registry_with(archive: TestArchiveReader) -> FileRegistry {
    FileRegistry::new(Arc::new(TestHttpClient), Arc::new(archive))
}

/// Creates a registry without network or archives.
pub fn registry() -> FileRegistry {
    registry_with(TestArchiveReader::default())
}

/// Wraps the given lists in a SED-ML Level 1 Version 4 document.
pub fn sedml_document(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sedML xmlns="http://sed-ml.org/sed-ml/level1/version4" level="1" version="4">
{body}
</sedML>
"#
    )
}

/// A CellML model whose class is left to a [`TestModelAnalyser`]
pub const EMPTY_CELLML: &[u8] = br#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="empty"/>"#;

/// x' = -k x with x(0) = 2 and k = 0.5, a computed constant
/// `half_life = ln(2) / k` and an algebraic variable `y = 2 x`
pub const DECAY_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.cellml.org/cellml/1.1#" xmlns:cellml="http://www.cellml.org/cellml/1.1#" name="decay">
  <component name="environment">
    <variable name="time" units="second" public_interface="out"/>
  </component>
  <component name="main">
    <variable name="time" units="second" public_interface="in"/>
    <variable name="x" units="millimolar" initial_value="2"/>
    <variable name="k" units="per_second" initial_value="0.5"/>
    <variable name="half_life" units="second"/>
    <variable name="y" units="millimolar"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/>
        <apply><diff/><bvar><ci>time</ci></bvar><ci>x</ci></apply>
        <apply><minus/><apply><times/><ci>k</ci><ci>x</ci></apply></apply>
      </apply>
      <apply><eq/>
        <ci>half_life</ci>
        <apply><divide/><apply><ln/><cn cellml:units="dimensionless">2</cn></apply><ci>k</ci></apply>
      </apply>
      <apply><eq/>
        <ci>y</ci>
        <apply><times/><cn cellml:units="dimensionless">2</cn><ci>x</ci></apply>
      </apply>
    </math>
  </component>
  <connection>
    <map_components component_1="environment" component_2="main"/>
    <map_variables variable_1="time" variable_2="time"/>
  </connection>
</model>
"#;

/// x + y = a and x - y = 1, with a = 3
pub const NLA_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.cellml.org/cellml/2.0#" name="nla">
  <component name="main">
    <variable name="x" units="dimensionless" initial_value="1"/>
    <variable name="y" units="dimensionless"/>
    <variable name="a" units="dimensionless" initial_value="3"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/><apply><plus/><ci>x</ci><ci>y</ci></apply><ci>a</ci></apply>
      <apply><eq/><apply><minus/><ci>x</ci><ci>y</ci></apply><cn>1</cn></apply>
    </math>
  </component>
</model>
"#;

/// x' = -z with x(0) = 1, where z^3 + z = x
pub const DAE_MODEL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.cellml.org/cellml/2.0#" name="dae">
  <component name="main">
    <variable name="t" units="second"/>
    <variable name="x" units="dimensionless" initial_value="1"/>
    <variable name="z" units="dimensionless"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/>
        <apply><diff/><bvar><ci>t</ci></bvar><ci>x</ci></apply>
        <apply><minus/><ci>z</ci></apply>
      </apply>
      <apply><eq/>
        <apply><plus/><apply><power/><ci>z</ci><cn>3</cn></apply><ci>z</ci></apply>
        <ci>x</ci>
      </apply>
    </math>
  </component>
</model>
"#;

/// c = a + b, where nothing computes b
pub const UNDERCONSTRAINED_MODEL: &str = r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="under">
  <component name="main">
    <variable name="a" units="dimensionless" initial_value="1"/>
    <variable name="b" units="dimensionless"/>
    <variable name="c" units="dimensionless"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/><ci>c</ci><apply><plus/><ci>a</ci><ci>b</ci></apply></apply>
    </math>
  </component>
</model>
"#;
