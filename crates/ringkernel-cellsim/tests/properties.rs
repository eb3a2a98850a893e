//! Behavioural properties of the rule, flood, seeder and stimulus.

use rand::rngs::StdRng;
use rand::SeedableRng;

use ringkernel_cellsim::simulation::{
    apply_stimulus, evaluate, flood, moore_neighbors, seed, CellGrid, CellState,
    StimulusOutcome, Transition,
};

fn grid_with(width: usize, height: usize, cells: &[(usize, usize, CellState)]) -> CellGrid {
    let grid = CellGrid::new(width, height).unwrap();
    for &(x, y, state) in cells {
        grid.set(x, y, state).unwrap();
    }
    grid
}

#[test]
fn test_interior_infection_threshold() {
    for cancer in 0..=8 {
        let grid = CellGrid::new(9, 9).unwrap();
        for (x, y) in moore_neighbors(4, 4, 9, 9).take(cancer) {
            grid.set(x, y, CellState::Cancer).unwrap();
        }
        let snapshot = grid.snapshot();
        let expected = if cancer >= 6 {
            Transition::Infect
        } else {
            Transition::Stay
        };
        assert_eq!(evaluate(&snapshot, 4, 4), expected, "{} cancer neighbours", cancer);
    }
}

#[test]
fn test_interior_heal_threshold() {
    for medicine in 0..=8 {
        let grid = CellGrid::new(9, 9).unwrap();
        grid.set(4, 4, CellState::Cancer).unwrap();
        for (x, y) in moore_neighbors(4, 4, 9, 9).take(medicine) {
            grid.set(x, y, CellState::Medicine).unwrap();
        }
        let expected = if medicine >= 6 {
            Transition::Heal
        } else {
            Transition::Stay
        };
        assert_eq!(evaluate(&grid, 4, 4), expected, "{} medicine neighbours", medicine);
    }
}

#[test]
fn test_boundary_cells_never_transition() {
    let (w, h) = (6, 5);
    let boundary: Vec<(usize, usize)> = (0..w)
        .flat_map(|x| (0..h).map(move |y| (x, y)))
        .filter(|&(x, y)| x == 0 || y == 0 || x == w - 1 || y == h - 1)
        .collect();

    // Boundary cell Healthy, everything else Cancer.
    for &(bx, by) in &boundary {
        let grid = CellGrid::new(w, h).unwrap();
        grid.fill(CellState::Cancer);
        grid.set(bx, by, CellState::Healthy).unwrap();
        assert_eq!(evaluate(&grid, bx, by), Transition::Stay, "({}, {})", bx, by);
    }

    // Boundary cell Cancer, everything else Medicine.
    for &(bx, by) in &boundary {
        let grid = CellGrid::new(w, h).unwrap();
        grid.fill(CellState::Medicine);
        grid.set(bx, by, CellState::Cancer).unwrap();
        assert_eq!(evaluate(&grid, bx, by), Transition::Stay, "({}, {})", bx, by);
    }
}

#[test]
fn test_heal_block_next_to_trigger() {
    // 5x5 Medicine block at (3..8, 3..8); trigger diagonal to its corner.
    let grid = CellGrid::new(12, 12).unwrap();
    for x in 3..8 {
        for y in 3..8 {
            grid.set(x, y, CellState::Medicine).unwrap();
        }
    }
    grid.set(2, 2, CellState::Cancer).unwrap();

    flood::heal(&grid, 2, 2);

    let counts = grid.counts();
    assert_eq!(counts.medicine, 0);
    assert_eq!(counts.cancer, 0);
    assert_eq!(counts.healthy, 144);
}

#[test]
fn test_heal_leaves_unconnected_medicine() {
    let grid = grid_with(
        10,
        10,
        &[
            (1, 1, CellState::Cancer),
            (2, 2, CellState::Medicine),
            (3, 3, CellState::Medicine),
            // Two cells away from (3, 3): not 8-connected.
            (5, 5, CellState::Medicine),
            (6, 5, CellState::Medicine),
        ],
    );

    let healed = flood::heal(&grid, 1, 1);

    assert_eq!(healed, 3);
    assert_eq!(grid.get(5, 5).unwrap(), CellState::Medicine);
    assert_eq!(grid.get(6, 5).unwrap(), CellState::Medicine);
    assert_eq!(grid.counts().medicine, 2);
}

#[test]
fn test_stimulus_on_cancer_changes_one_cell() {
    let grid = CellGrid::new(8, 8).unwrap();
    seed(&grid, 0.6, &mut StdRng::seed_from_u64(4)).unwrap();
    let (x, y) = (0..64)
        .map(|i| grid.coords(i))
        .find(|&(x, y)| grid.get(x, y).unwrap() == CellState::Cancer)
        .unwrap();
    let before = grid.snapshot();

    assert_eq!(apply_stimulus(&grid, x, y).unwrap(), StimulusOutcome::Absorbed);

    let after = grid.snapshot();
    let changed: Vec<usize> = (0..64)
        .filter(|&i| before.cells()[i] != after.cells()[i])
        .collect();
    assert_eq!(changed, vec![grid.index(x, y)]);
    assert_eq!(grid.get(x, y).unwrap(), CellState::Healthy);
}

#[test]
fn test_stimulus_spread_sizes() {
    let grid = CellGrid::new(1024, 768).unwrap();
    assert_eq!(
        apply_stimulus(&grid, 500, 300).unwrap(),
        StimulusOutcome::Spread { cells: 9 }
    );
    assert_eq!(
        apply_stimulus(&grid, 1023, 767).unwrap(),
        StimulusOutcome::Spread { cells: 4 }
    );
    assert_eq!(
        apply_stimulus(&grid, 0, 100).unwrap(),
        StimulusOutcome::Spread { cells: 6 }
    );
    assert_eq!(grid.counts().medicine, 19);
}

#[test]
fn test_seed_default_grid() {
    let grid = CellGrid::new(1024, 768).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    seed(&grid, 0.26, &mut rng).unwrap();

    let counts = grid.counts();
    assert!(counts.cancer >= 204_013, "only {} cancer cells", counts.cancer);
    assert_eq!(counts.cancer + counts.healthy, 1024 * 768);
    assert_eq!(counts.medicine, 0);
}
