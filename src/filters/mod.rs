//! Built-in structural filters.
//!
//! These exercise the two-phase contract end-to-end: staging actions in
//! preflight, working through the typed-dispatch entry point in execute,
//! and polling cancellation over chunked element loops. They carry no
//! numeric kernels beyond a comparison; domain algorithms live in external
//! filter crates.

use crate::actions::{Action, OutputActions};
use crate::filter::chunks::{DEFAULT_CHUNK, for_each_chunk};
use crate::filter::{
    Arguments, ExecuteContext, Filter, PreflightOutput, PreflightValue,
};
use crate::mill_error::DataMillError;
use crate::result::{MillResult, fail, ok};
use crate::store::array::{DataArray, shape_len};
use crate::store::path::DataPath;
use crate::store::structure::DataStructure;
use crate::store::tagged::{ArrayElement, ArrayOp, ArrayOpMut};

/// Stage `CreateGroup` actions for every missing ancestor of `path`.
fn stage_missing_ancestors(store: &DataStructure, path: &DataPath, actions: &mut OutputActions) {
    let Ok(parent) = path.parent() else {
        return;
    };
    if store.contains(&parent) {
        return;
    }
    stage_missing_ancestors(store, &parent, actions);
    actions.push(Action::CreateGroup { path: parent });
}

// ---------------------------------------------------------------------------
// CreateDataArrayFilter
// ---------------------------------------------------------------------------

/// Creates a typed array (and any missing parent groups), then fills it
/// with a configured initial value.
///
/// Arguments: `output_path` (path), `data_type` (type), `tuple_shape`
/// (tuple shape), `component_shape` (tuple shape), `initial_value` (float,
/// optional, defaults to zero).
#[derive(Clone, Copy, Debug, Default)]
pub struct CreateDataArrayFilter;

impl CreateDataArrayFilter {
    /// Registry key.
    pub const NAME: &'static str = "CreateDataArray";
}

struct FillWith {
    value: f64,
}

impl ArrayOpMut for FillWith {
    type Output = ();

    fn apply<T: ArrayElement>(self, array: &mut DataArray<T>) {
        array.fill(T::from_f64(self.value));
    }
}

impl Filter for CreateDataArrayFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn human_name(&self) -> &str {
        "Create Data Array"
    }

    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput> {
        let output = match args.path("output_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let data_type = match args.data_type("data_type") {
            Ok(tag) => tag,
            Err(err) => return fail(err),
        };
        let tuple_shape = match args.tuple_shape("tuple_shape") {
            Ok(shape) => shape.to_vec(),
            Err(err) => return fail(err),
        };
        let component_shape = match args.tuple_shape("component_shape") {
            Ok(shape) => shape.to_vec(),
            Err(err) => return fail(err),
        };
        if store.contains(&output) {
            return fail(DataMillError::DuplicateName {
                parent: output.parent().unwrap_or_else(|_| output.clone()),
                name: output.name().to_owned(),
            });
        }

        let mut actions = OutputActions::new();
        stage_missing_ancestors(store, &output, &mut actions);
        actions.push(Action::CreateArray {
            path: output.clone(),
            data_type,
            tuple_shape: tuple_shape.clone(),
            component_shape,
        });
        let mut out = PreflightOutput::from_actions(actions);
        out.preflight_values.push(PreflightValue {
            name: "Tuple Count".into(),
            value: shape_len(&tuple_shape).to_string(),
        });
        ok(out)
    }

    fn execute(
        &self,
        store: &mut DataStructure,
        args: &Arguments,
        ctx: &ExecuteContext<'_>,
    ) -> MillResult<()> {
        let output = match args.path("output_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let initial = args.float("initial_value").unwrap_or(0.0);
        if ctx.cancel.is_cancelled() {
            return fail(DataMillError::Cancelled);
        }
        match store.array_mut(&output) {
            Ok(array) => array.dispatch_mut(FillWith { value: initial }),
            Err(err) => return fail(err),
        }
        ctx.info(self.human_name(), format!("initialized `{output}` to {initial}"));
        ok(())
    }
}

// ---------------------------------------------------------------------------
// CreateImageGeometryFilter
// ---------------------------------------------------------------------------

/// Creates an image geometry sized at creation, with a cell attribute
/// matrix matching the cell dimensions.
///
/// Arguments: `geometry_path` (path), `dims` (tuple shape of length 3),
/// `cell_matrix_name` (text, optional, defaults to `CellData`).
#[derive(Clone, Copy, Debug, Default)]
pub struct CreateImageGeometryFilter;

impl CreateImageGeometryFilter {
    /// Registry key.
    pub const NAME: &'static str = "CreateImageGeometry";
}

impl Filter for CreateImageGeometryFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn human_name(&self) -> &str {
        "Create Image Geometry"
    }

    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput> {
        let path = match args.path("geometry_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let dims = match args.tuple_shape("dims") {
            Ok(&[x, y, z]) => [x, y, z],
            Ok(_) => {
                return fail(DataMillError::ArgumentTypeMismatch {
                    key: "dims".into(),
                    expected: "tuple shape of length 3",
                    found: "tuple shape",
                });
            }
            Err(err) => return fail(err),
        };
        let matrix_name = args.text("cell_matrix_name").unwrap_or("CellData").to_owned();

        let mut actions = OutputActions::new();
        stage_missing_ancestors(store, &path, &mut actions);
        actions.push(Action::CreateGeometry {
            path: path.clone(),
            config: crate::geometry::GeometryConfig::Image {
                dims,
                spacing: [1.0; 3],
                origin: [0.0; 3],
            },
        });
        let matrix_path = match path.child(matrix_name) {
            Ok(p) => p,
            Err(err) => return fail(err),
        };
        actions.push(Action::CreateAttributeMatrix {
            path: matrix_path,
            tuple_shape: dims.to_vec(),
        });
        let mut out = PreflightOutput::from_actions(actions);
        out.preflight_values.push(PreflightValue {
            name: "Cell Count".into(),
            value: dims.iter().product::<usize>().to_string(),
        });
        ok(out)
    }

    fn execute(
        &self,
        _store: &mut DataStructure,
        _args: &Arguments,
        _ctx: &ExecuteContext<'_>,
    ) -> MillResult<()> {
        ok(())
    }
}

// ---------------------------------------------------------------------------
// ThresholdMaskFilter
// ---------------------------------------------------------------------------

/// Writes a boolean mask marking the tuples of a numeric input whose first
/// component exceeds a threshold.
///
/// Arguments: `input_path` (path), `output_path` (path), `threshold`
/// (float). The output array is staged with the input's tuple shape, so
/// the pair always stays co-indexed.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThresholdMaskFilter;

impl ThresholdMaskFilter {
    /// Registry key.
    pub const NAME: &'static str = "ThresholdMask";
}

struct MaskAbove<'a> {
    threshold: f64,
    cancel: &'a crate::filter::CancelToken,
    mask: &'a mut Vec<bool>,
}

impl ArrayOp for MaskAbove<'_> {
    type Output = Result<(), DataMillError>;

    fn apply<T: ArrayElement>(self, array: &DataArray<T>) -> Self::Output {
        let tuples = array.tuple_count();
        self.mask.resize(tuples, false);
        for_each_chunk(tuples, DEFAULT_CHUNK, self.cancel, |range| {
            for t in range {
                let first = array
                    .tuple(t)
                    .ok()
                    .and_then(|comps| comps.first())
                    .map(|v| v.to_f64());
                self.mask[t] = matches!(first, Some(v) if v > self.threshold);
            }
        })
    }
}

impl Filter for ThresholdMaskFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn human_name(&self) -> &str {
        "Threshold Mask"
    }

    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput> {
        let input = match args.path("input_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let output = match args.path("output_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        if args.float("threshold").is_err() {
            return fail(DataMillError::MissingArgument("threshold".into()));
        }
        let source = match store.array(&input) {
            Ok(array) => array,
            Err(err) => return fail(err),
        };
        if !source.data_type().is_numeric() {
            return fail(DataMillError::DisallowedType(source.data_type()));
        }
        if store.contains(&output) {
            return fail(DataMillError::DuplicateName {
                parent: output.parent().unwrap_or_else(|_| output.clone()),
                name: output.name().to_owned(),
            });
        }

        let mut actions = OutputActions::new();
        stage_missing_ancestors(store, &output, &mut actions);
        actions.push(Action::CreateArray {
            path: output,
            data_type: crate::store::tagged::DataType::Boolean,
            tuple_shape: source.tuple_shape().to_vec(),
            component_shape: vec![1],
        });
        let mut out = PreflightOutput::from_actions(actions);
        out.preflight_values.push(PreflightValue {
            name: "Mask Tuple Count".into(),
            value: source.tuple_count().to_string(),
        });
        ok(out)
    }

    fn execute(
        &self,
        store: &mut DataStructure,
        args: &Arguments,
        ctx: &ExecuteContext<'_>,
    ) -> MillResult<()> {
        let input = match args.path("input_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let output = match args.path("output_path") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let threshold = match args.float("threshold") {
            Ok(value) => value,
            Err(err) => return fail(err),
        };
        // The staged output shares the input's tuple shape; this is the
        // co-indexing contract execute relies on.
        if let Err(err) = store.validate_number_of_tuples(&[input.clone(), output.clone()]) {
            return fail(err);
        }

        let mut mask = Vec::new();
        let masked = {
            let source = match store.array(&input) {
                Ok(array) => array,
                Err(err) => return fail(err),
            };
            source.dispatch(MaskAbove {
                threshold,
                cancel: &ctx.cancel,
                mask: &mut mask,
            })
        };
        if let Err(err) = masked {
            return fail(err);
        }

        let target = match store.array_of_mut::<bool>(&output) {
            Ok(array) => array,
            Err(err) => return fail(err),
        };
        target.as_mut_slice().copy_from_slice(&mask);
        ctx.progress(self.human_name(), mask.len(), mask.len());
        ok(())
    }
}

// ---------------------------------------------------------------------------
// RenameObjectFilter / DeleteObjectFilter
// ---------------------------------------------------------------------------

/// Renames a single object; a one-action structural filter.
///
/// Arguments: `target` (path), `new_name` (text).
#[derive(Clone, Copy, Debug, Default)]
pub struct RenameObjectFilter;

impl RenameObjectFilter {
    /// Registry key.
    pub const NAME: &'static str = "RenameObject";
}

impl Filter for RenameObjectFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn human_name(&self) -> &str {
        "Rename Object"
    }

    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput> {
        let target = match args.path("target") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        let new_name = match args.text("new_name") {
            Ok(name) => name.to_owned(),
            Err(err) => return fail(err),
        };
        if !store.contains(&target) {
            return fail(DataMillError::NotFound(target));
        }
        let mut actions = OutputActions::new();
        actions.push(Action::RenameObject {
            path: target,
            new_name,
        });
        ok(PreflightOutput::from_actions(actions))
    }

    fn execute(
        &self,
        _store: &mut DataStructure,
        _args: &Arguments,
        _ctx: &ExecuteContext<'_>,
    ) -> MillResult<()> {
        ok(())
    }
}

/// Removes a single object (non-forced); a one-action structural filter.
///
/// Arguments: `target` (path).
#[derive(Clone, Copy, Debug, Default)]
pub struct DeleteObjectFilter;

impl DeleteObjectFilter {
    /// Registry key.
    pub const NAME: &'static str = "DeleteObject";
}

impl Filter for DeleteObjectFilter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn human_name(&self) -> &str {
        "Delete Object"
    }

    fn preflight(&self, store: &DataStructure, args: &Arguments) -> MillResult<PreflightOutput> {
        let target = match args.path("target") {
            Ok(path) => path.clone(),
            Err(err) => return fail(err),
        };
        if !store.contains(&target) {
            return fail(DataMillError::NotFound(target));
        }
        let mut actions = OutputActions::new();
        actions.push(Action::DeleteObject { path: target });
        ok(PreflightOutput::from_actions(actions))
    }

    fn execute(
        &self,
        _store: &mut DataStructure,
        _args: &Arguments,
        _ctx: &ExecuteContext<'_>,
    ) -> MillResult<()> {
        ok(())
    }
}
