#![no_main]

use heistbench::chain::Payload;
use heistbench::exec::ExecutorCall;
use heistbench::governance::QueueCall;
use heistbench::scenario::truster::{self, TrusterParams};
use heistbench::targets::{PoolCall, TokenCall, VaultCall};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let payload = Payload::from_bytes(data.to_vec());
    let _ = payload.function_name();
    let _ = payload.decode::<ExecutorCall>();
    let _ = payload.decode::<QueueCall>();
    let _ = payload.decode::<TokenCall>();
    let _ = payload.decode::<PoolCall>();
    let _ = payload.decode::<VaultCall>();

    // Arbitrary calldata against live targets must fail cleanly and leave
    // the world consistent.
    let Ok(mut setup) = truster::bootstrap(&TrusterParams::default()) else {
        return;
    };
    let (player, pool, token) = (setup.player, setup.pool, setup.token);
    let supply_before = setup.world.token(token).map(|t| t.total_supply()).ok();
    for target in [pool, token] {
        let _ = setup.world.transact(player, target, 0, &payload);
        assert_eq!(setup.world.depth(), 0);
    }
    let supply_after = setup.world.token(token).map(|t| t.total_supply()).ok();
    assert_eq!(supply_before, supply_after);
});
