#![no_main]

use libfuzzer_sys::fuzz_target;
use roastbout::config::GameConfig;
use roastbout::damage::{Battle, Combatant, resolve};
use roastbout::model::AttackType;

fn attack(b: u8) -> Option<AttackType> {
    AttackType::ALL.get(usize::from(b % 4)).copied()
}

fn side(d: &[u8]) -> Combatant {
    Combatant {
        hp: u32::from(u16::from_le_bytes([d[0], d[1]])),
        win_streak: u32::from(d[2] % 8),
        votes: u32::from(d[3]),
        answer_len: usize::from(d[4]),
        attack: attack(d[5]),
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 14 {
        return;
    }
    let config = GameConfig::default();
    let battle = Battle {
        round: 1 + data[12] % 3,
        left: side(&data[0..6]),
        right: side(&data[6..12]),
        bragging: data[13] & 1 == 1,
    };
    let out = resolve(&config.damage, &battle);

    for (before, after) in [(&battle.left, &out.left), (&battle.right, &out.right)] {
        assert!(after.hp <= before.hp);
        if after.knocked_out {
            assert_eq!(after.hp, 0);
        }
        if battle.bragging {
            assert_eq!(after.hp, before.hp);
        }
    }
});
