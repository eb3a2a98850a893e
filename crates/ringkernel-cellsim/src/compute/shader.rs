//! WGSL source for the cell update kernel.

/// Compute shader evaluating the transition rule for one cell per lane.
///
/// Bindings: `0` uniform grid size, `1` previous generation (read-only),
/// `2` next generation (written only where a transition fires). Lanes are
/// laid out as `i = gid.y * (num_workgroups.x * 256) + gid.x` so the host may
/// fold a long 1D dispatch into two dimensions.
pub const CELL_UPDATE_WGSL: &str = r#"
struct Params {
    width: u32,
    height: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read> cells_in: array<u32>;
@group(0) @binding(2) var<storage, read_write> cells_out: array<u32>;

const HEALTHY: u32 = 0u;
const CANCER: u32 = 1u;
const MEDICINE: u32 = 2u;
const THRESHOLD: u32 = 6u;

fn count_neighbors(x: u32, y: u32, wanted: u32) -> u32 {
    var count = 0u;
    for (var dx = -1; dx <= 1; dx++) {
        for (var dy = -1; dy <= 1; dy++) {
            if (dx == 0 && dy == 0) {
                continue;
            }
            let nx = i32(x) + dx;
            let ny = i32(y) + dy;
            if (nx < 0 || ny < 0 || nx >= i32(params.width) || ny >= i32(params.height)) {
                continue;
            }
            if (cells_in[u32(nx) * params.height + u32(ny)] == wanted) {
                count += 1u;
            }
        }
    }
    return count;
}

@compute @workgroup_size(256)
fn update_cells(
    @builtin(global_invocation_id) gid: vec3u,
    @builtin(num_workgroups) groups: vec3u,
) {
    let i = gid.y * groups.x * 256u + gid.x;
    let total = params.width * params.height;
    if (i >= total) {
        return;
    }

    let x = i / params.height;
    let y = i % params.height;
    let state = cells_in[i];

    if (state == HEALTHY) {
        if (count_neighbors(x, y, CANCER) >= THRESHOLD) {
            cells_out[i] = CANCER;
        }
    } else if (state == CANCER) {
        if (count_neighbors(x, y, MEDICINE) >= THRESHOLD) {
            cells_out[i] = HEALTHY;
        }
    }
}
"#;

/// Entry point name of [`CELL_UPDATE_WGSL`].
pub const CELL_UPDATE_ENTRY: &str = "update_cells";
