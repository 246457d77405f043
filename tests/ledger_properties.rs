//! Property tests for balance arithmetic and the ledger

use proptest::prelude::*;
use rust_decimal::Decimal;

use fixed_asset::database::DatabaseService;
use fixed_asset::models::{
    apply_delta, BalanceChange, CreateUserRequest, NewPatient, TokenType, TransactionType, UserRole,
};
use fixed_asset::FixedAssetError;

fn amount() -> impl Strategy<Value = Decimal> {
    // Two decimal places, up to 10,000.00
    (0i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn signed_amount() -> impl Strategy<Value = Decimal> {
    (-1_000_000i64..1_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

proptest! {
    #[test]
    fn apply_delta_never_goes_negative(balance in amount(), delta in signed_amount()) {
        match apply_delta(balance, delta) {
            Some(next) => {
                prop_assert!(next >= Decimal::ZERO);
                prop_assert_eq!(next, balance + delta);
            }
            None => prop_assert!(balance + delta < Decimal::ZERO),
        }
    }

    #[test]
    fn credit_then_debit_restores_balance(balance in amount(), delta in amount()) {
        let credited = apply_delta(balance, delta).unwrap();
        prop_assert_eq!(apply_delta(credited, -delta), Some(balance));
    }

    #[test]
    fn store_balance_matches_confirmed_ledger(deltas in prop::collection::vec(signed_amount(), 1..25)) {
        tokio_test::block_on(async {
            let db = DatabaseService::in_memory();
            let user = db.users.create_user(CreateUserRequest {
                email: "prop@example.com".to_string(),
                name: "Prop".to_string(),
                password_hash: "x".to_string(),
                role: UserRole::Patient,
                wallet_address: None,
            }).await.unwrap();
            let patient = db.patients.create_patient(NewPatient {
                user_id: user.id,
                registration_id: "PAT-PROP0001".to_string(),
            }).await.unwrap();

            let mut expected = Decimal::ZERO;
            let mut accepted = 0usize;
            for delta in deltas.into_iter().filter(|d| !d.is_zero()) {
                let tx_type = if delta > Decimal::ZERO { TransactionType::Mint } else { TransactionType::Burn };
                let change = BalanceChange::new(patient.id, TokenType::Ht, delta, tx_type);
                match db.tokens.apply_balance_change(change).await {
                    Ok((balance, tx)) => {
                        expected += delta;
                        accepted += 1;
                        assert_eq!(balance.health_token_balance, expected);
                        assert_eq!(tx.amount, delta.abs());
                    }
                    Err(FixedAssetError::InsufficientBalance { available, .. }) => {
                        assert_eq!(available, expected);
                        assert!(expected + delta < Decimal::ZERO);
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }

            let balance = db.tokens.balance(patient.id).await.unwrap();
            assert_eq!(balance.health_token_balance, expected);
            assert_eq!(balance.asset_token_balance, Decimal::ZERO);
            let ledger = db.tokens.list_transactions(patient.id, Some(TokenType::Ht)).await.unwrap();
            assert_eq!(ledger.len(), accepted);
        });
    }
}
