//! Square assignment, number randomizing and winner lookup.
//!
//! Everything here is pure: callers own the grid and labels and replace them with what these
//! functions return. Randomness is always passed in so tests can seed it.

use rand::Rng;

use crate::error::SquaresError;
use crate::model::{
    Grid, Labels, Participant, PlayerSquare, Quarter, QuarterScore, WinnerRecord, GRID_SIZE,
    GRID_WIDTH, QUARTER_COUNT,
};

/// Fisher-Yates: walk from the last index down to 1, swapping each slot with a uniformly chosen
/// index in `[0, i]`.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Sum of every requested count on the roster, including entries that don't have a name yet.
pub fn total_requested(roster: &[Participant]) -> u64 {
    roster.iter().map(|p| u64::from(p.squares)).sum()
}

/// Spreads the named participants over `grid_size` cells, each getting exactly the number of
/// squares they asked for. Unused cells are `None`.
pub fn assign_squares<R: Rng + ?Sized>(
    roster: &[Participant],
    grid_size: usize,
    rng: &mut R,
) -> Result<Vec<Option<String>>, SquaresError> {
    let named: Vec<(&str, u32)> = roster
        .iter()
        .filter_map(|p| p.display_name().map(|name| (name, p.squares)))
        .collect();
    if named.is_empty() {
        return Err(SquaresError::NoParticipants);
    }

    let requested: u64 = named.iter().map(|&(_, count)| u64::from(count)).sum();
    if requested > grid_size as u64 {
        return Err(SquaresError::OverCapacity {
            requested,
            capacity: grid_size,
        });
    }

    let mut cells: Vec<Option<String>> = Vec::with_capacity(grid_size);
    for &(name, count) in &named {
        cells.extend((0..count).map(|_| Some(name.to_string())));
    }
    shuffle(&mut cells, rng);

    cells.resize(grid_size, None);
    shuffle(&mut cells, rng);

    Ok(cells)
}

/// `assign_squares` over the standard 100-cell board.
pub fn fill_grid<R: Rng + ?Sized>(roster: &[Participant], rng: &mut R) -> Result<Grid, SquaresError> {
    assign_squares(roster, GRID_SIZE, rng).map(Grid::from)
}

/// New row and column numbers, each an independent shuffle of 0-9.
pub fn randomize_labels<R: Rng + ?Sized>(rng: &mut R) -> (Labels, Labels) {
    (shuffled_labels(rng), shuffled_labels(rng))
}

fn shuffled_labels<R: Rng + ?Sized>(rng: &mut R) -> Labels {
    let mut digits = *Labels::identity().digits();
    shuffle(&mut digits, rng);
    match Labels::from_digits(&digits) {
        Ok(labels) => labels,
        // A shuffle of a permutation is still a permutation.
        Err(_) => Labels::identity(),
    }
}

/// Maps each set quarter score to its square, in quarter order.
///
/// Only the last digit of each score counts. A quarter is left out when a digit can't be found
/// on the labels; a winning square nobody holds is reported with `winner: None`.
pub fn resolve_winners(
    row_labels: &Labels,
    column_labels: &Labels,
    grid: &Grid,
    quarters: &[QuarterScore; QUARTER_COUNT],
) -> Vec<WinnerRecord> {
    Quarter::ALL
        .iter()
        .filter_map(|&quarter| {
            let (column_score, row_score) = quarters[quarter.index()].pair()?;
            let row = row_labels.position_of(last_digit(row_score))?;
            let column = column_labels.position_of(last_digit(column_score))?;
            let cell_index = row * GRID_WIDTH + column;
            Some(WinnerRecord {
                quarter,
                column_score,
                row_score,
                cell_index,
                winner: grid.get(cell_index).map(str::to_string),
            })
        })
        .collect()
}

fn last_digit(score: u32) -> u8 {
    (score % 10) as u8
}

/// Every square held by `name`, as (column digit, row digit), in board order.
pub fn player_squares(
    grid: &Grid,
    row_labels: &Labels,
    column_labels: &Labels,
    name: &str,
) -> Vec<PlayerSquare> {
    grid.cells()
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.as_deref() == Some(name))
        .filter_map(|(index, _)| {
            Some(PlayerSquare {
                column_digit: column_labels.digit_at(index % GRID_WIDTH)?,
                row_digit: row_labels.digit_at(index / GRID_WIDTH)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn roster(entries: &[(&str, u32)]) -> Vec<Participant> {
        entries
            .iter()
            .map(|&(name, squares)| Participant::new(name, squares))
            .collect()
    }

    fn is_permutation(labels: &Labels) -> bool {
        let digits: HashSet<u8> = labels.digits().iter().copied().collect();
        digits == (0..10).collect::<HashSet<u8>>()
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..50).collect::<Vec<u32>>());

        // Empty and single-element slices are left alone.
        let mut empty: Vec<u32> = vec![];
        shuffle(&mut empty, &mut rng);
        let mut single = vec![42];
        shuffle(&mut single, &mut rng);
        assert_eq!(single, vec![42]);
    }

    #[test]
    fn test_assign_exact_counts() {
        let mut rng = StdRng::seed_from_u64(1);
        let players = roster(&[("Alice", 2), ("Bob", 3)]);
        let grid = fill_grid(&players, &mut rng).expect("assignment should succeed");

        assert_eq!(grid.cells().len(), GRID_SIZE);
        assert_eq!(grid.count_for("Alice"), 2);
        assert_eq!(grid.count_for("Bob"), 3);
        assert_eq!(grid.assigned_count(), 5);
        assert_eq!(grid.cells().iter().filter(|c| c.is_none()).count(), 95);
    }

    #[test]
    fn test_assign_exact_counts_many_seeds() {
        let players = roster(&[("A", 10), ("B", 25), ("C", 1), ("D", 40), ("E", 24)]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = fill_grid(&players, &mut rng).expect("assignment should succeed");
            for p in &players {
                assert_eq!(grid.count_for(&p.name), p.squares as usize);
            }
            assert_eq!(grid.assigned_count(), 100);
        }
    }

    #[test]
    fn test_assign_single_player_fills_board() {
        let mut rng = StdRng::seed_from_u64(3);
        let grid = fill_grid(&roster(&[("Solo", 100)]), &mut rng).expect("fits exactly");
        assert!(grid.cells().iter().all(|c| c.as_deref() == Some("Solo")));
    }

    #[test]
    fn test_assign_over_capacity() {
        let mut rng = StdRng::seed_from_u64(4);
        let players = roster(&[("Alice", 60), ("Bob", 41)]);
        let err = fill_grid(&players, &mut rng).expect_err("101 squares can't fit");
        assert_eq!(
            err,
            SquaresError::OverCapacity {
                requested: 101,
                capacity: 100
            }
        );
        assert_eq!(err.to_string(), "Total squares (101) exceeds 100!");

        // Custom grid sizes are honored.
        let err = assign_squares(&roster(&[("Alice", 5)]), 4, &mut rng).expect_err("too many");
        assert!(matches!(err, SquaresError::OverCapacity { requested: 5, capacity: 4 }));
    }

    #[test]
    fn test_assign_no_participants() {
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(fill_grid(&[], &mut rng), Err(SquaresError::NoParticipants));
        assert_eq!(
            fill_grid(&roster(&[("  ", 3), ("", 2)]), &mut rng),
            Err(SquaresError::NoParticipants)
        );
    }

    #[test]
    fn test_assign_ignores_blank_names_and_trims() {
        let mut rng = StdRng::seed_from_u64(6);
        // The blank entry's 99 squares don't count against capacity.
        let players = roster(&[("  Alice  ", 4), ("   ", 99)]);
        let grid = fill_grid(&players, &mut rng).expect("blank entry is skipped");
        assert_eq!(grid.count_for("Alice"), 4);
        assert_eq!(grid.assigned_count(), 4);
        assert_eq!(total_requested(&players), 103);
    }

    #[test]
    fn test_assign_is_spread_out() {
        // With one square assigned, every cell should be reachable across enough seeds.
        let players = roster(&[("Alice", 1)]);
        let mut hit = HashSet::new();
        for seed in 0..2000 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = fill_grid(&players, &mut rng).expect("fits");
            let index = grid
                .cells()
                .iter()
                .position(|c| c.is_some())
                .expect("one square assigned");
            hit.insert(index);
        }
        assert_eq!(hit.len(), GRID_SIZE);
    }

    #[test]
    fn test_randomize_labels_are_permutations() {
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..100 {
            let (rows, columns) = randomize_labels(&mut rng);
            assert!(is_permutation(&rows));
            assert!(is_permutation(&columns));
        }
    }

    #[test]
    fn test_resolve_winners_example() {
        let mut cells = vec![None; GRID_SIZE];
        cells[73] = Some("Alice".to_string());
        let grid = Grid::from(cells);

        let mut quarters = [QuarterScore::default(); QUARTER_COUNT];
        quarters[0] = QuarterScore::new(13, 27);
        quarters[1] = QuarterScore::new(20, 14);

        let winners = resolve_winners(&Labels::identity(), &Labels::identity(), &grid, &quarters);
        assert_eq!(winners.len(), 2);

        assert_eq!(winners[0].quarter, Quarter::Q1);
        assert_eq!(winners[0].column_score, 13);
        assert_eq!(winners[0].row_score, 27);
        assert_eq!(winners[0].cell_index, 73);
        assert_eq!(winners[0].winner.as_deref(), Some("Alice"));

        // Column 0, row 4 is empty: the quarter is reported without a winner.
        assert_eq!(winners[1].quarter, Quarter::Q2);
        assert_eq!(winners[1].cell_index, 40);
        assert_eq!(winners[1].winner, None);
    }

    #[test]
    fn test_resolve_winners_uses_labels() {
        let rows = Labels::from_digits(&[9, 8, 7, 6, 5, 4, 3, 2, 1, 0]).expect("valid");
        let columns = Labels::from_digits(&[5, 6, 7, 8, 9, 0, 1, 2, 3, 4]).expect("valid");
        let mut cells = vec![None; GRID_SIZE];
        // Row digit 7 sits at position 2, column digit 3 at position 8.
        cells[28] = Some("Bob".to_string());
        let grid = Grid::from(cells);

        let mut quarters = [QuarterScore::default(); QUARTER_COUNT];
        quarters[3] = QuarterScore::new(23, 17);
        let winners = resolve_winners(&rows, &columns, &grid, &quarters);

        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].quarter, Quarter::Q4);
        assert_eq!(winners[0].cell_index, 28);
        assert_eq!(winners[0].winner.as_deref(), Some("Bob"));
    }

    #[test]
    fn test_resolve_winners_skips_unset_quarters() {
        let quarters = [
            QuarterScore {
                column: Some(3),
                row: None,
            },
            QuarterScore::default(),
            QuarterScore {
                column: None,
                row: Some(10),
            },
            QuarterScore::new(0, 0),
        ];
        let winners =
            resolve_winners(&Labels::identity(), &Labels::identity(), &Grid::empty(), &quarters);
        assert_eq!(winners.len(), 1);
        assert_eq!(winners[0].quarter, Quarter::Q4);
        assert_eq!(winners[0].cell_index, 0);
    }

    #[test]
    fn test_resolve_winners_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(9);
        let grid = fill_grid(&roster(&[("Alice", 30), ("Bob", 30)]), &mut rng).expect("fits");
        let (rows, columns) = randomize_labels(&mut rng);
        let quarters = [
            QuarterScore::new(7, 3),
            QuarterScore::new(14, 10),
            QuarterScore::new(21, 13),
            QuarterScore::new(28, 20),
        ];
        let first = resolve_winners(&rows, &columns, &grid, &quarters);
        let second = resolve_winners(&rows, &columns, &grid, &quarters);
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_player_squares() {
        let rows = Labels::from_digits(&[3, 1, 4, 0, 5, 9, 2, 6, 8, 7]).expect("valid");
        let columns = Labels::from_digits(&[2, 7, 1, 8, 0, 9, 3, 6, 5, 4]).expect("valid");
        let mut cells = vec![None; GRID_SIZE];
        cells[0] = Some("Alice".to_string());
        cells[57] = Some("Alice".to_string());
        cells[58] = Some("Bob".to_string());
        let grid = Grid::from(cells);

        let squares = player_squares(&grid, &rows, &columns, "Alice");
        assert_eq!(
            squares,
            vec![
                PlayerSquare {
                    column_digit: 2,
                    row_digit: 3
                },
                PlayerSquare {
                    column_digit: 6,
                    row_digit: 9
                },
            ]
        );
        assert!(player_squares(&grid, &rows, &columns, "Carol").is_empty());
    }
}
