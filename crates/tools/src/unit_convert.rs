//! Unit conversion tool: length, mass, volume and temperature.

use agentloop_core::{ParamSpec, Tool, ToolArgs, ToolError};
use async_trait::async_trait;

use crate::calculator::format_number;

pub struct UnitConvertTool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Length,
    Mass,
    Volume,
    Temperature,
}

/// Linear units as (aliases, dimension, factor to the SI base unit).
const LINEAR_UNITS: &[(&[&str], Dimension, f64)] = &[
    (&["m", "meter", "meters", "metre", "metres"], Dimension::Length, 1.0),
    (&["km", "kilometer", "kilometers"], Dimension::Length, 1000.0),
    (&["cm", "centimeter", "centimeters"], Dimension::Length, 0.01),
    (&["mm", "millimeter", "millimeters"], Dimension::Length, 0.001),
    (&["mi", "mile", "miles"], Dimension::Length, 1609.344),
    (&["yd", "yard", "yards"], Dimension::Length, 0.9144),
    (&["ft", "foot", "feet"], Dimension::Length, 0.3048),
    (&["in", "inch", "inches"], Dimension::Length, 0.0254),
    (&["kg", "kilogram", "kilograms"], Dimension::Mass, 1.0),
    (&["g", "gram", "grams"], Dimension::Mass, 0.001),
    (&["lb", "lbs", "pound", "pounds"], Dimension::Mass, 0.453_592_37),
    (&["oz", "ounce", "ounces"], Dimension::Mass, 0.028_349_523_125),
    (&["l", "liter", "liters", "litre", "litres"], Dimension::Volume, 1.0),
    (&["ml", "milliliter", "milliliters"], Dimension::Volume, 0.001),
    (&["gal", "gallon", "gallons"], Dimension::Volume, 3.785_411_784),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Unit {
    Linear(Dimension, f64),
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl Unit {
    fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "c" | "celsius" | "°c" => return Some(Unit::Celsius),
            "f" | "fahrenheit" | "°f" => return Some(Unit::Fahrenheit),
            "k" | "kelvin" => return Some(Unit::Kelvin),
            _ => {}
        }
        LINEAR_UNITS
            .iter()
            .find(|(aliases, _, _)| aliases.contains(&name.as_str()))
            .map(|(_, dim, factor)| Unit::Linear(*dim, *factor))
    }

    fn dimension(self) -> Dimension {
        match self {
            Unit::Linear(dim, _) => dim,
            Unit::Celsius | Unit::Fahrenheit | Unit::Kelvin => Dimension::Temperature,
        }
    }
}

fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, String> {
    if from.dimension() != to.dimension() {
        return Err(format!(
            "Cannot convert {:?} to {:?}",
            from.dimension(),
            to.dimension()
        ));
    }
    let kelvin = match from {
        Unit::Linear(_, factor) => {
            let Unit::Linear(_, to_factor) = to else {
                return Err("Unit mismatch".into());
            };
            return Ok(value * factor / to_factor);
        }
        Unit::Celsius => value + 273.15,
        Unit::Fahrenheit => (value - 32.0) * 5.0 / 9.0 + 273.15,
        Unit::Kelvin => value,
    };
    if kelvin < 0.0 {
        return Err("Temperature below absolute zero".into());
    }
    Ok(match to {
        Unit::Celsius => kelvin - 273.15,
        Unit::Fahrenheit => (kelvin - 273.15) * 9.0 / 5.0 + 32.0,
        _ => kelvin,
    })
}

#[async_trait]
impl Tool for UnitConvertTool {
    fn name(&self) -> &str {
        "unit_convert"
    }

    fn description(&self) -> &str {
        "Convert a quantity between units of length, mass, volume or temperature.\n\n\
         Args:\n    value: The quantity to convert\n    \
         from_unit: Source unit, e.g. 'km', 'lb', 'celsius'\n    \
         to_unit: Target unit, e.g. 'mi', 'kg', 'fahrenheit'"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("value", "f64"),
            ParamSpec::new("from_unit", "&str"),
            ParamSpec::new("to_unit", "&str"),
        ]
    }

    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let value = args.f64("value")?;
        let from_name = args.str("from_unit")?;
        let to_name = args.str("to_unit")?;

        let failed = |reason: String| ToolError::ExecutionFailed {
            tool_name: "unit_convert".into(),
            reason,
        };
        let from = Unit::parse(from_name).ok_or_else(|| failed(format!("Unknown unit: {from_name}")))?;
        let to = Unit::parse(to_name).ok_or_else(|| failed(format!("Unknown unit: {to_name}")))?;

        let result = convert(value, from, to).map_err(failed)?;
        let rounded = (result * 1e6).round() / 1e6;
        Ok(format!("{} {from_name} = {} {to_name}", format_number(value), format_number(rounded)))
    }
}
