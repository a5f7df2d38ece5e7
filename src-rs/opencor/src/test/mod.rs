use std::sync::Arc;

use opencor_file::{HttpClient, HttpError, ZipArchiveReader};

use crate::engine::Engine;

/// An HTTP client for a machine without network access
pub struct OfflineClient;

impl HttpClient for OfflineClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, HttpError> {
        Err(HttpError::Request {
            url: url.to_string(),
            message: "the network is unreachable".to_string(),
        })
    }
}

pub fn engine() -> Engine {
    Engine::with_collaborators(Arc::new(OfflineClient), Arc::new(ZipArchiveReader))
}

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
