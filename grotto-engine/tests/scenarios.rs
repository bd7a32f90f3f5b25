mod common;

use common::*;
use grotto_core::{GuessComparison, PoolStatus, PotKind, Wager};
use grotto_engine::{PoolParams, WagerError};

#[test]
fn count_based_lotto_settles_and_pays_winner() {
    let h = harness();
    let bet = 1_000;
    let id = h
        .grotto
        .create_lotto(&h.creator, PoolParams::count_based(3, units(bet)))
        .unwrap();

    let players = players(3);
    for (i, player) in players.iter().enumerate() {
        let status = h.grotto.play_lotto(player, id, units(bet)).unwrap();
        let expected = if i == 2 {
            PoolStatus::Settled
        } else {
            PoolStatus::Open
        };
        assert_eq!(status, expected);
    }

    let lotto = h.grotto.ledger().read().lotto(id).cloned().unwrap();
    assert!(lotto.pool.is_finished());
    let winner = lotto.winner.clone().unwrap();
    assert!(players.contains(&winner));
    assert_eq!(lotto.pool.stakes, units(3_000));
    assert_eq!(lotto.winning_amount, units(2_400));
    assert_eq!(lotto.pool.creator_shares, units(600));

    let claimed = h.grotto.claim(&winner, id).unwrap();
    assert_eq!(claimed, lotto.winning_amount);
    assert_eq!(h.grotto.reader().balance_of(&winner), units(2_400));
}

#[test]
fn second_claim_and_early_creator_claim_are_rejected() {
    let h = harness();
    let id = h
        .grotto
        .create_lotto(&h.creator, PoolParams::count_based(2, units(100)))
        .unwrap();
    let players = players(2);
    for player in &players {
        h.grotto.play_lotto(player, id, units(100)).unwrap();
    }
    let winner = h.grotto.ledger().read().lotto(id).unwrap().winner.clone().unwrap();

    h.grotto.claim(&winner, id).unwrap();
    assert!(matches!(
        h.grotto.claim(&winner, id),
        Err(WagerError::AlreadyClaimed(_))
    ));

    // multi-winner pot: creator waits for a winner claim
    let pot = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(2, 50, &[1, 2], GuessComparison::ExactOrder),
            PotKind::MultiWinner,
        )
        .unwrap();
    h.grotto.play_pot(&players[0], pot, vec![1, 2], units(50)).unwrap();
    h.grotto.play_pot(&players[1], pot, vec![2, 1], units(50)).unwrap();

    assert!(matches!(
        h.grotto.claim_creator(&h.creator, pot),
        Err(WagerError::CreatorCannotClaimYet(_))
    ));
}

#[test]
fn time_based_lotto_rejects_plays_before_start() {
    let h = harness();
    let start = h.grotto.now() + 100_000_000;
    let id = h
        .grotto
        .create_lotto(&h.creator, PoolParams::time_based(start, start + 3_600, units(10)))
        .unwrap();

    let result = h.grotto.play_lotto(&addr("alice"), id, units(10));
    assert!(matches!(result, Err(WagerError::NotStarted(_))));
    assert!(h.grotto.ledger().read().lotto(id).unwrap().pool.players.is_empty());
}

#[test]
fn exact_order_pot_pays_only_exact_guesses() {
    let h = harness();
    let bet = 200;
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(5, bet, &[3, 6, 9, 3], GuessComparison::ExactOrder),
            PotKind::MultiWinner,
        )
        .unwrap();

    let players = players(5);
    let guesses = [
        vec![3, 6, 9, 3],
        vec![3, 6, 3, 9],
        vec![9, 6, 3, 3],
        vec![3, 6, 9, 3],
        vec![3, 3, 6, 9],
    ];
    for (player, guess) in players.iter().zip(guesses) {
        h.grotto.play_pot(player, id, guess, units(bet)).unwrap();
    }

    let pot = h.grotto.ledger().read().pot(id).cloned().unwrap();
    assert_eq!(pot.pool.status, PoolStatus::Settled);
    assert_eq!(pot.winners, vec![players[0].clone(), players[3].clone()]);

    let share = units(1_000 * 80 / 100 / 2);
    assert_eq!(pot.winner_share, share);
    for winner in [&players[0], &players[3]] {
        assert_eq!(h.grotto.claim(winner, id).unwrap(), share);
    }
    assert!(matches!(
        h.grotto.claim(&players[1], id),
        Err(WagerError::NotAWinner(_))
    ));
}

#[test]
fn single_winner_pot_ends_on_first_match() {
    let h = harness();
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(10, 100, &[4, 2], GuessComparison::ExactOrder),
            PotKind::SingleWinner,
        )
        .unwrap();

    let players = players(3);
    h.grotto
        .play_single_winner_pot(&players[0], id, vec![2, 4], units(100))
        .unwrap();
    let status = h
        .grotto
        .play_single_winner_pot(&players[1], id, vec![4, 2], units(100))
        .unwrap();
    assert_eq!(status, PoolStatus::Settled);

    // 70% of 200
    assert_eq!(h.grotto.claim(&players[1], id).unwrap(), units(140));

    let late = h
        .grotto
        .play_single_winner_pot(&players[2], id, vec![4, 2], units(100));
    assert!(matches!(late, Err(WagerError::AlreadyFinished(_))));

    let pot = h.grotto.ledger().read().pot(id).cloned().unwrap();
    assert_eq!(pot.winners.len(), 1);
    assert_eq!(pot.pool.players.len(), 2);
}

#[test]
fn pot_without_matches_pays_creator_everything() {
    let h = harness();
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(3, 70, &[1, 1, 1], GuessComparison::NumbersOnly),
            PotKind::MultiWinner,
        )
        .unwrap();

    for (player, guess) in players(3).iter().zip([[1, 1, 2], [2, 1, 1], [0, 0, 0]]) {
        h.grotto.play_pot(player, id, guess.to_vec(), units(70)).unwrap();
    }

    let stakes = match h.grotto.reader().get_by_id(id).unwrap() {
        Wager::Pot(pot) => {
            assert!(pot.winners.is_empty());
            pot.pool.stakes
        }
        Wager::Lotto(_) => unreachable!(),
    };

    assert_eq!(h.grotto.claim_creator(&h.creator, id).unwrap(), stakes);
    assert_eq!(h.grotto.reader().balance_of(&h.creator), units(210));
    assert_eq!(h.grotto.reader().custody(), units(0));
}

fn assert_creator_takes_all(settlement: &grotto_engine::Settlement, stakes: grotto_core::Amount) {
    assert!(settlement.winners.is_empty());
    assert_eq!(settlement.per_winner, units(0));
    assert_eq!(settlement.creator_shares, stakes);
    assert_eq!(settlement.platform_shares, units(0));
}

#[test]
fn full_single_winner_pot_without_match_pays_creator() {
    let h = harness();
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(3, 100, &[4, 2], GuessComparison::ExactOrder),
            PotKind::SingleWinner,
        )
        .unwrap();

    let mut status = PoolStatus::Open;
    for (player, guess) in players(3).iter().zip([[2, 4], [4, 4], [1, 2]]) {
        status = h
            .grotto
            .play_single_winner_pot(player, id, guess.to_vec(), units(100))
            .unwrap();
    }
    assert_eq!(status, PoolStatus::Settled);

    let settlement = h.grotto.find_winner(&h.operator, id).unwrap();
    assert_creator_takes_all(&settlement, units(300));

    assert!(matches!(
        h.grotto.claim_platform(&h.operator, id),
        Err(WagerError::NothingToClaim(_))
    ));
    assert!(matches!(
        h.grotto.claim(&addr("player1"), id),
        Err(WagerError::NotAWinner(_))
    ));
    assert_eq!(h.grotto.claim_creator(&h.creator, id).unwrap(), units(300));
    assert_eq!(h.grotto.reader().custody(), units(0));
}

#[test]
fn single_winner_pot_without_match_waits_for_manual_settlement() {
    let config = grotto_core::EngineConfig::default().with_auto_settle(false);
    let h = harness_with(config, [7u8; 32]);
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            pot_request(2, 50, &[9, 9, 1], GuessComparison::NumbersOnly),
            PotKind::SingleWinner,
        )
        .unwrap();

    let players = players(2);
    h.grotto
        .play_single_winner_pot(&players[0], id, vec![9, 1, 1], units(50))
        .unwrap();
    let status = h
        .grotto
        .play_single_winner_pot(&players[1], id, vec![0, 0, 0], units(50))
        .unwrap();
    assert_eq!(status, PoolStatus::Closed);
    assert!(matches!(
        h.grotto.claim_creator(&h.creator, id),
        Err(WagerError::NotFinished(_))
    ));

    let settlement = h.grotto.find_winner(&h.operator, id).unwrap();
    assert_creator_takes_all(&settlement, units(100));
    assert_eq!(
        h.grotto.reader().get_by_id(id).unwrap().pool().status,
        PoolStatus::Settled
    );

    assert!(matches!(
        h.grotto.claim_platform(&h.operator, id),
        Err(WagerError::NothingToClaim(_))
    ));
    assert_eq!(h.grotto.claim_creator(&h.creator, id).unwrap(), units(100));
}

#[test]
fn timed_single_winner_pot_without_match_pays_creator_on_end() {
    let h = harness();
    let id = h
        .grotto
        .create_pot(
            &h.creator,
            grotto_engine::CreatePot {
                params: PoolParams::time_based(START, START + 60, units(40)),
                winning_numbers: vec![5],
                comparison: GuessComparison::ExactOrder,
            },
            PotKind::SingleWinner,
        )
        .unwrap();

    h.grotto
        .play_single_winner_pot(&addr("player1"), id, vec![6], units(40))
        .unwrap();
    h.clock.advance(61);

    let settlement = h.grotto.end(&addr("player1"), id).unwrap();
    assert_creator_takes_all(&settlement, units(40));
    assert_eq!(h.grotto.claim_creator(&h.creator, id).unwrap(), units(40));
}
