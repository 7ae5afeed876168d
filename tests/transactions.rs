use std::collections::BTreeMap;

use pretty_assertions::assert_eq;

use ethvm::{
    Address, Builder, Ethvm, ExecutorError, ExitStatus, Executor, Fork, MemoryState, State,
    TxError, Word,
    common::{account::Account, address::addr, block::Env},
    fork::Config,
};

const SENDER: Address = addr("0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266");
const COINBASE: Address = addr("0x2adc25665018aa1fe0e6bc666dac8fc2697ff9ba");
const CONTRACT: Address = addr("0x1000000000000000000000000000000000000001");
const OTHER: Address = addr("0x1000000000000000000000000000000000000002");

// SSTORE(0, SLOAD(0) + 1)
const COUNTER: &str = "600054600101600055";

fn ether() -> Word {
    Word::from(1_000_000_000_000_000_000u64)
}

fn executor_with(
    fork: Fork,
    env: Env,
    contracts: &[(Address, &str)],
) -> eyre::Result<Executor<MemoryState>> {
    let mut state = MemoryState::new();
    state.insert(SENDER, Account::with_balance(ether()), BTreeMap::new());
    for (address, code) in contracts {
        let code = hex::decode(code)?;
        state.insert(*address, Account::new(1, Word::zero(), code), BTreeMap::new());
    }
    Ok(Executor::new(state, Config::new(fork), env))
}

fn executor(fork: Fork, contracts: &[(Address, &str)]) -> eyre::Result<Executor<MemoryState>> {
    let env = Env {
        coinbase: COINBASE,
        gas_limit: 30_000_000,
        chain_id: 1,
        ..Default::default()
    };
    executor_with(fork, env, contracts)
}

#[test]
fn test_transfer() -> eyre::Result<()> {
    let mut executor = executor(Fork::Istanbul, &[])?;
    let result = Ethvm::new()
        .transfer(OTHER, Word::from(100u8))
        .with_sender(SENDER)
        .with_gas_price(Word::one())
        .apply(&mut executor)?;

    assert!(result.is_success());
    assert_eq!(result.gas_used, 21000);
    let state = executor.state();
    assert_eq!(state.balance(&OTHER), Word::from(100u8));
    assert_eq!(state.balance(&SENDER), ether() - Word::from(100u8) - Word::from(21000u64));
    assert_eq!(state.balance(&COINBASE), Word::from(21000u64));
    assert_eq!(state.nonce(&SENDER), 1);
    Ok(())
}

#[test]
fn test_transfer_pays_tip_to_coinbase() -> eyre::Result<()> {
    let env = Env {
        coinbase: COINBASE,
        gas_limit: 30_000_000,
        base_fee: Word::from(10u8),
        chain_id: 1,
        ..Default::default()
    };
    let mut executor = executor_with(Fork::London, env, &[])?;
    let result = Ethvm::new()
        .transfer(OTHER, Word::one())
        .with_sender(SENDER)
        .with_fees(Word::from(20u8), Word::from(2u8))
        .apply(&mut executor)?;

    assert_eq!(result.gas_used, 21000);
    let state = executor.state();
    // effective price is base fee + tip = 12, the base fee part is burnt
    let paid = Word::from(21000u64 * 12);
    assert_eq!(state.balance(&SENDER), ether() - paid - Word::one());
    assert_eq!(state.balance(&COINBASE), Word::from(21000u64 * 2));
    Ok(())
}

#[test]
fn test_rejected_transactions_leave_state_untouched() -> eyre::Result<()> {
    let mut executor = executor(Fork::Berlin, &[])?;
    let root = executor.state().root();

    let error = Ethvm::new()
        .transfer(OTHER, Word::one())
        .with_sender(SENDER)
        .with_nonce(5)
        .apply(&mut executor)
        .unwrap_err();
    assert!(matches!(
        error,
        ExecutorError::Tx(TxError::NonceMismatch { expected: 0, got: 5, .. })
    ));

    let error = Ethvm::new()
        .transfer(OTHER, ether())
        .with_sender(SENDER)
        .with_gas_price(Word::one())
        .apply(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ExecutorError::Tx(TxError::InsufficientFunds { .. })));

    let error = Ethvm::new()
        .transfer(OTHER, Word::one())
        .with_sender(SENDER)
        .with_gas(20_000)
        .apply(&mut executor)
        .unwrap_err();
    assert!(matches!(error, ExecutorError::Tx(TxError::IntrinsicGasTooLow { .. })));

    assert_eq!(executor.state().root(), root);
    Ok(())
}

#[test]
fn test_zero_value_transfer_to_missing_account_is_pruned() -> eyre::Result<()> {
    let mut executor = executor(Fork::SpuriousDragon, &[])?;
    let result = Ethvm::new()
        .transfer(OTHER, Word::zero())
        .with_sender(SENDER)
        .apply(&mut executor)?;
    assert!(result.is_success());
    assert!(!executor.state().exists(&OTHER));
    Ok(())
}

#[test]
fn test_counter() -> eyre::Result<()> {
    let mut executor = executor(Fork::Istanbul, &[(CONTRACT, COUNTER)])?;
    let first = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;
    // PUSH1 SLOAD(800) PUSH1 ADD PUSH1 SSTORE(20000)
    assert_eq!(first.gas_used, 21000 + 3 + 800 + 3 + 3 + 3 + 20000);

    let second = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .with_nonce(1)
        .apply(&mut executor)?;
    assert_eq!(second.gas_used, 21000 + 3 + 800 + 3 + 3 + 3 + 5000);
    assert_eq!(
        executor.state().storage(&CONTRACT, &Word::zero()),
        Word::from(2u8)
    );
    Ok(())
}

#[test]
fn test_add_and_store() -> eyre::Result<()> {
    // PUSH1 1 PUSH1 2 ADD PUSH1 0 SSTORE STOP
    let mut executor = executor(Fork::Istanbul, &[(CONTRACT, "600160020160005500")])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;
    assert!(result.is_success());
    assert_eq!(result.gas_used, 21000 + 3 + 3 + 3 + 3 + 20000);
    assert_eq!(executor.state().storage(&CONTRACT, &Word::zero()), Word::from(3u8));
    Ok(())
}

#[test]
fn test_revert_rolls_back_and_keeps_gas() -> eyre::Result<()> {
    // SSTORE(0, 1); MSTORE(0, 42); REVERT(0, 32)
    let code = "6001600055602a60005260206000fd";
    let mut executor = executor(Fork::Istanbul, &[(CONTRACT, code)])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;

    let mut expected = vec![0u8; 32];
    expected[31] = 42;
    assert_eq!(result.status, ExitStatus::Reverted(expected));
    assert_eq!(result.gas_used, 21000 + 3 + 3 + 20000 + 3 + 3 + 6 + 3 + 3);
    assert_eq!(executor.state().storage(&CONTRACT, &Word::zero()), Word::zero());
    assert_eq!(executor.state().nonce(&SENDER), 1);
    Ok(())
}

#[test]
fn test_exceptional_halt_consumes_all_gas() -> eyre::Result<()> {
    // INVALID
    let mut executor = executor(Fork::Berlin, &[(CONTRACT, "fe")])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .with_gas(50_000)
        .apply(&mut executor)?;
    assert!(matches!(result.status, ExitStatus::Errored(_)));
    assert_eq!(result.gas_used, 50_000);
    Ok(())
}

#[test]
fn test_call_to_missing_account_succeeds() -> eyre::Result<()> {
    // CALL(0xffff, OTHER, 0, 0, 0, 0, 0); SSTORE(0, success)
    let code = format!(
        "6000600060006000600073{}61fffff1600055",
        hex::encode(OTHER.0)
    );
    let mut executor = executor(Fork::Istanbul, &[(CONTRACT, &code)])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;
    assert!(result.is_success());
    assert_eq!(executor.state().storage(&CONTRACT, &Word::zero()), Word::one());
    assert!(!executor.state().exists(&OTHER));
    Ok(())
}

#[test]
fn test_call_depth_limit() -> eyre::Result<()> {
    // Increment slot 0, then CALL(GAS - 100, ADDRESS, 0, 0, 0, 0, 0).
    // Frames at depths 0 through 1024 run; the call made at depth 1024 fails.
    let code = "600054600101600055600060006000600060003060645a03f100";
    let mut executor = executor(Fork::Frontier, &[(CONTRACT, code)])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .with_gas(10_000_000)
        .apply(&mut executor)?;
    assert!(result.is_success());
    assert_eq!(
        executor.state().storage(&CONTRACT, &Word::zero()),
        Word::from(1025u64)
    );
    Ok(())
}

#[test]
fn test_create_then_call() -> eyre::Result<()> {
    // CODECOPY(0, 12, 9); RETURN(0, 9) followed by the counter runtime
    let initcode = hex::decode(format!("6009600c60003960096000f3{COUNTER}"))?;
    let mut executor = executor(Fork::Istanbul, &[])?;
    let result = Ethvm::new()
        .create(initcode)
        .with_sender(SENDER)
        .apply(&mut executor)?;

    assert!(result.is_success());
    let address = SENDER.create(0);
    assert_eq!(result.created, Some(address));
    let account = executor.state().account(&address).unwrap();
    assert_eq!(account.nonce, 1);
    assert_eq!(hex::encode(&account.code[..]), COUNTER);

    let result = Ethvm::new()
        .execute(address, "", &[])
        .with_sender(SENDER)
        .with_nonce(1)
        .apply(&mut executor)?;
    assert!(result.is_success());
    assert_eq!(executor.state().storage(&address, &Word::zero()), Word::one());
    Ok(())
}

#[test]
fn test_create2_address() -> eyre::Result<()> {
    let initcode = format!("6009600c60003960096000f3{COUNTER}");
    // 21 bytes of initcode: MSTORE(0, PUSH21 initcode) leaves it at offset 11,
    // then SSTORE(0, CREATE2(0, 11, 21, 1))
    let code = format!("74{initcode}60005260016015600b6000f5600055");
    let mut executor = executor(Fork::Cancun, &[(CONTRACT, &code)])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;
    assert!(result.is_success());

    let expected = CONTRACT.create2(&Word::one(), &hex::decode(&initcode)?);
    assert_eq!(
        executor.state().storage(&CONTRACT, &Word::zero()),
        Word::from(expected)
    );
    let account = executor.state().account(&expected).unwrap();
    assert_eq!(hex::encode(&account.code[..]), COUNTER);
    // the factory nonce is bumped by the creation
    assert_eq!(executor.state().nonce(&CONTRACT), 2);
    Ok(())
}

#[test]
fn test_selfdestruct() -> eyre::Result<()> {
    // SELFDESTRUCT(OTHER)
    let code = format!("73{}ff", hex::encode(OTHER.0));

    // from Cancun only the balance moves when the contract predates the transaction
    for (fork, destroyed) in [(Fork::Istanbul, true), (Fork::Cancun, false)] {
        let mut executor = executor(fork, &[(CONTRACT, &code)])?;
        executor.state_mut().set_balance(&CONTRACT, Word::from(500u64));
        let result = Ethvm::new()
            .execute(CONTRACT, "", &[])
            .with_sender(SENDER)
            .apply(&mut executor)?;
        assert!(result.is_success());
        assert_eq!(executor.state().exists(&CONTRACT), !destroyed, "{fork}");
        assert_eq!(executor.state().balance(&CONTRACT), Word::zero());
        assert_eq!(executor.state().balance(&OTHER), Word::from(500u64));
    }
    Ok(())
}

#[test]
fn test_selfdestructed_account_is_drained_but_kept_until_tx_end() -> eyre::Result<()> {
    const VICTIM: Address = addr("0x1000000000000000000000000000000000000003");
    // SELFDESTRUCT(OTHER), 22 bytes
    let victim = format!("73{}ff", hex::encode(OTHER.0));
    // CALL(0xffff, VICTIM, 0, 0, 0, 0, 0); POP;
    // SSTORE(0, BALANCE(VICTIM)); SSTORE(1, EXTCODESIZE(VICTIM))
    let target = hex::encode(VICTIM.0);
    let caller = format!(
        "6000600060006000600073{target}61fffff15073{target}3160005573{target}3b600155"
    );

    for (fork, destroyed) in [(Fork::Istanbul, true), (Fork::Cancun, false)] {
        let mut executor = executor(fork, &[(CONTRACT, &caller), (VICTIM, &victim)])?;
        executor.state_mut().set_balance(&VICTIM, Word::from(500u64));
        let result = Ethvm::new()
            .execute(CONTRACT, "", &[])
            .with_sender(SENDER)
            .apply(&mut executor)?;
        assert!(result.is_success(), "{fork}");

        let state = executor.state();
        assert_eq!(state.storage(&CONTRACT, &Word::zero()), Word::zero(), "{fork}");
        assert_eq!(state.storage(&CONTRACT, &Word::one()), Word::from(22u8), "{fork}");
        assert_eq!(state.exists(&VICTIM), !destroyed, "{fork}");
        assert_eq!(state.balance(&OTHER), Word::from(500u64), "{fork}");
    }
    Ok(())
}

#[test]
fn test_logs() -> eyre::Result<()> {
    // MSTORE(0, 42); LOG1(0, 32, 7)
    let code = "602a600052600760206000a100";
    let mut executor = executor(Fork::Shanghai, &[(CONTRACT, code)])?;
    let result = Ethvm::new()
        .execute(CONTRACT, "", &[])
        .with_sender(SENDER)
        .apply(&mut executor)?;

    assert_eq!(result.logs.len(), 1);
    let log = &result.logs[0];
    assert_eq!(log.address, CONTRACT);
    assert_eq!(log.topics, vec![Word::from(7u8)]);
    assert_eq!(log.data.as_slice()[31], 42);
    Ok(())
}

#[test]
fn test_precompiles_via_transaction() -> eyre::Result<()> {
    let sha256 = addr("0x0000000000000000000000000000000000000002");
    let identity = addr("0x0000000000000000000000000000000000000004");
    let mut executor = executor(Fork::Cancun, &[])?;

    let result = Ethvm::new()
        .execute(sha256, "", b"abc")
        .with_sender(SENDER)
        .apply(&mut executor)?;
    assert_eq!(
        hex::encode(result.output()),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );

    let result = Ethvm::new()
        .execute(identity, "", &[1, 2, 3])
        .with_sender(SENDER)
        .with_nonce(1)
        .apply(&mut executor)?;
    assert_eq!(result.output(), &[1, 2, 3]);
    Ok(())
}
