use super::specification::ExpressionTyper;
use crate::diff::comparison::ContentChanges;
use crate::graph::{ExecutionMode, MappingOptions};
use crate::types::TypeShape;

/// Selects the part of `input` a mapping node works on: the `inputField`
/// sub-shape, unwrapped to its item shape in loop mode.
pub(crate) fn mapped_input(
    mapping: &MappingOptions,
    input: &TypeShape,
    typer: &mut ExpressionTyper<'_>,
) -> TypeShape {
    let selected = match mapping.input_field() {
        Some(field) => typer.calculate(input, field),
        None => input.clone(),
    };
    if mapping.is_loop() {
        selected.array_item()
    } else {
        selected
    }
}

/// Shapes the result of a mapping node: re-wrapped as an array in loop mode,
/// nested under `outputPath`, then merged into the original input when the
/// node passes its input through.
pub(crate) fn mapped_output(
    mapping: &MappingOptions,
    input: &TypeShape,
    determined: TypeShape,
) -> TypeShape {
    let mut output = if mapping.is_loop() {
        determined.into_array()
    } else {
        determined
    };
    if let Some(path) = mapping.output_path() {
        let mut wrapped = TypeShape::empty_object();
        wrapped.set(path, output);
        output = wrapped;
    }
    if mapping.pass_through() {
        input.merge(&output)
    } else {
        output
    }
}

/// Compares the mapping options shared by expression, table and decision nodes.
pub(crate) fn compare_mapping(
    changes: &mut ContentChanges,
    previous: &MappingOptions,
    current: &MappingOptions,
) {
    let mode = |m: &MappingOptions| match m.execution_mode.unwrap_or_default() {
        ExecutionMode::Single => "single",
        ExecutionMode::Loop => "loop",
    };
    changes
        .string("executionMode", Some(mode(previous)), Some(mode(current)))
        .string(
            "inputField",
            previous.input_field.as_deref(),
            current.input_field.as_deref(),
        )
        .string(
            "outputPath",
            previous.output_path.as_deref(),
            current.output_path.as_deref(),
        )
        .boolean("passThrough", previous.pass_through, current.pass_through);
}
