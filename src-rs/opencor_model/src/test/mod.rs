//! CellML models used by the tests

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

/// x + y = a and x - y = 1, solved together with x = 1 as initial guess
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

/// Two equations computing b
pub const OVERCONSTRAINED_MODEL: &str = r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="over">
  <component name="main">
    <variable name="b" units="dimensionless"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/><ci>b</ci><cn>2</cn></apply>
      <apply><eq/><ci>b</ci><cn>3</cn></apply>
    </math>
  </component>
</model>
"#;

/// Two equations computing b, and d = c where nothing computes c
pub const UNSUITABLY_CONSTRAINED_MODEL: &str = r#"<model xmlns="http://www.cellml.org/cellml/2.0#" name="unsuitable">
  <component name="main">
    <variable name="b" units="dimensionless"/>
    <variable name="c" units="dimensionless"/>
    <variable name="d" units="dimensionless"/>
    <math xmlns="http://www.w3.org/1998/Math/MathML">
      <apply><eq/><ci>b</ci><cn>2</cn></apply>
      <apply><eq/><ci>b</ci><cn>3</cn></apply>
      <apply><eq/><ci>d</ci><ci>c</ci></apply>
    </math>
  </component>
</model>
"#;
