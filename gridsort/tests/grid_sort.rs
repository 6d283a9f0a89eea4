/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

use std::time::Duration;

use gridcomm::CommError;
use gridcomm::LocalWorld;
use gridsort::Comparison;
use gridsort::GridProcess;
use gridsort::LocalRun;
use gridsort::SortConfig;
use gridsort::SortError;
use gridsort::input::random_input;
use gridsort::partition::scatter;
use gridsort::rank::local_rank;
use gridsort::sort_local;
use gridslice::GridError;
use proptest::prelude::*;

fn chars(s: &str) -> Vec<char> {
    s.chars().collect()
}

async fn sort(side: usize, input: &[char]) -> LocalRun<char> {
    sort_local(&SortConfig::new(side), input).await.unwrap()
}

fn reference_sort<T: Ord + Clone>(input: &[T]) -> Vec<T> {
    let mut sorted = input.to_vec();
    sorted.sort();
    sorted
}

#[tokio::test]
async fn test_four_letter_example() {
    let run = sort(2, &chars("abcd")).await;
    let reports: Vec<_> = run.outcomes.iter().map(|o| o.report()).collect();

    // Columns hold {a, c} and {b, d}.
    assert_eq!(reports[0].column_data, chars("ac"));
    assert_eq!(reports[2].column_data, chars("ac"));
    assert_eq!(reports[1].column_data, chars("bd"));
    assert_eq!(reports[3].column_data, chars("bd"));

    // Row r shares column r's data; together the rows cover the input.
    assert_eq!(reports[0].row_shared, chars("ac"));
    assert_eq!(reports[1].row_shared, chars("ac"));
    assert_eq!(reports[2].row_shared, chars("bd"));
    assert_eq!(reports[3].row_shared, chars("bd"));

    let root = run.root().unwrap();
    assert_eq!(root.concatenated, chars("acbd"));
    assert_eq!(root.global_ranks, vec![1, 3, 2, 4]);
    assert_eq!(root.sorted, chars("abcd"));
}

#[tokio::test]
async fn test_stage_invariants_on_random_input() {
    let side = 4;
    let input = random_input(side * side * 6, Some(42));
    let run = sort(side, &input).await;
    let fragments = scatter(&input, side * side).unwrap();

    for (rank, outcome) in run.outcomes.iter().enumerate() {
        let report = outcome.report();
        assert_eq!(report.rank, rank);
        let (row, col) = (rank / side, rank % side);

        // Column data: the column's fragments in rank order.
        let column: Vec<char> = (0..side)
            .flat_map(|r| fragments[r * side + col].clone())
            .collect();
        assert_eq!(report.column_data, column);

        // Row data: identical across the row, equal to column `row`.
        assert_eq!(report.row_shared, run.outcomes[row * side].report().row_shared);
        assert_eq!(report.row_shared, run.outcomes[row].report().column_data);
        assert_eq!(
            report.local_ranks,
            local_rank(&report.column_data, &report.row_shared, Comparison::AtMost)
        );
    }

    let root = run.root().unwrap();
    assert_eq!(root.global_ranks.len(), input.len());
    assert_eq!(root.concatenated.len(), input.len());
    for (rank, element) in root.global_ranks.iter().zip(&root.concatenated) {
        let expected = input.iter().filter(|c| *c <= element).count() as u64;
        assert_eq!(*rank, expected);
    }
    assert_eq!(root.sorted, reference_sort(&input));
}

#[tokio::test]
async fn test_runs_are_idempotent() {
    let input = random_input(3 * 3 * 5, Some(1));
    let first = sort(3, &input).await;
    let second = sort(3, &input).await;
    assert_eq!(first.sorted(), second.sorted());
    assert_eq!(first.root(), second.root());
}

#[tokio::test]
async fn test_duplicates_and_strict_comparison() {
    let input = chars("bbbbaaaaccccbbbb");
    for comparison in [Comparison::AtMost, Comparison::Below] {
        let config = SortConfig::new(2).with_comparison(comparison);
        let run = sort_local(&config, &input).await.unwrap();
        assert_eq!(run.sorted().unwrap(), reference_sort(&input).as_slice());
    }
}

#[tokio::test]
async fn test_single_process_grid() {
    let input = chars("zebra");
    let run = sort(1, &input).await;
    assert_eq!(run.outcomes.len(), 1);
    let report = run.outcomes[0].report();
    assert_eq!(report.row_shared, input);
    assert_eq!(
        report.local_ranks,
        local_rank(&input, &input, Comparison::AtMost)
    );
    assert_eq!(run.sorted().unwrap(), chars("aberz").as_slice());
}

#[tokio::test]
async fn test_generic_elements() {
    let input: Vec<String> = ["pear", "fig", "apple", "kiwi", "fig", "date", "plum", "lime", "yuzu"]
        .into_iter()
        .map(String::from)
        .collect();
    let run = sort_local(&SortConfig::new(3), &input).await.unwrap();
    assert_eq!(run.sorted().unwrap(), reference_sort(&input).as_slice());
}

#[tokio::test]
async fn test_empty_input() {
    let run = sort(2, &[]).await;
    assert!(run.sorted().unwrap().is_empty());
}

#[tokio::test]
async fn test_configuration_errors_precede_communication() {
    assert!(matches!(
        sort_local(&SortConfig::new(2), &chars("abcde")).await,
        Err(SortError::Indivisible {
            len: 5,
            processes: 4
        })
    ));

    // A world that is not the grid's square is rejected by every process.
    for comm in LocalWorld::new(5, &gridcomm::Config::new()).into_comms() {
        assert!(matches!(
            GridProcess::new(comm, &SortConfig::new(2)),
            Err(SortError::Grid(GridError::WorldSizeMismatch { .. }))
        ));
    }
}

#[tokio::test]
async fn test_oversized_grid_side_is_a_configuration_error() {
    let side = 1usize << (usize::BITS / 2);
    assert!(matches!(
        gridsort::Plan::new(&SortConfig::new(side), 0),
        Err(SortError::Grid(GridError::TooLarge { .. }))
    ));
    assert!(matches!(
        sort_local(&SortConfig::new(side), &chars("ab")).await,
        Err(SortError::Grid(GridError::TooLarge { .. }))
    ));
}

#[tokio::test]
async fn test_oversize_payload_is_rejected() {
    let config = SortConfig::new(2).with_comm(gridcomm::Config::new().with_max_payload_len(32));
    let input = random_input(2 * 2 * 8, Some(3));
    assert!(matches!(
        sort_local(&config, &input).await,
        Err(SortError::PayloadBound { max: 32, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_missing_process_stalls() {
    let config = SortConfig::new(2).with_comm(
        gridcomm::Config::new().with_stall_timeout(Duration::from_secs(1)),
    );
    let mut comms = LocalWorld::new(4, &config.comm).into_comms();
    // Rank 3 never runs.
    comms.truncate(3);
    let handles: Vec<_> = comms
        .into_iter()
        .enumerate()
        .map(|(rank, comm)| {
            let config = config.clone();
            tokio::spawn(async move {
                let mut process = GridProcess::new(comm, &config)?;
                process.run(vec![char::from(b'a' + rank as u8)]).await
            })
        })
        .collect();
    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(
            matches!(err, SortError::Comm(CommError::Stalled { .. }) | SortError::Comm(CommError::Closed(_))),
            "{err}"
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]
    #[test]
    fn grid_sort_matches_reference_sort(
        side in 1usize..4,
        fragment_len in 0usize..5,
        seed in any::<u64>(),
    ) {
        let input = random_input(side * side * fragment_len, Some(seed));
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let run = runtime.block_on(sort(side, &input));
        let root = run.root().unwrap();
        prop_assert_eq!(&root.sorted, &reference_sort(&input));
        // Ranks are non-decreasing along the output.
        let mut ranked: Vec<(u64, char)> = root
            .global_ranks
            .iter()
            .copied()
            .zip(root.concatenated.iter().copied())
            .collect();
        ranked.sort();
        prop_assert!(ranked.windows(2).all(|w| w[0].0 <= w[1].0));
    }
}
