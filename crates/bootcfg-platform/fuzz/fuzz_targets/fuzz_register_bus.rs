//! Fuzz test for the emulated register bus
//!
//! Runs arbitrary select/read/write sequences and checks that the register
//! space only changes through successful bulk writes.

#![no_main]

use arbitrary::Arbitrary;
use bootcfg_platform::{MemoryRegisterBus, RegisterBus, FREE_REGISTER_SPACE};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Select { reg: u8, index: u8 },
    Read { reg: u8, len: u8 },
    Write { reg: u8, data: Vec<u8> },
}

fuzz_target!(|ops: Vec<Op>| {
    let mut bus = MemoryRegisterBus::new();
    let mut shadow = [0u8; FREE_REGISTER_SPACE];
    let mut index = 0usize;

    for op in ops {
        match op {
            Op::Select { reg, index: value } => {
                if bus.write_reg(reg, value).is_ok() {
                    index = usize::from(value);
                }
            }
            Op::Read { reg, len } => {
                let mut buf = vec![0u8; usize::from(len)];
                if bus.read_reg_buf(reg, &mut buf).is_ok() {
                    assert_eq!(buf[..], shadow[index..index + buf.len()]);
                    index = (index + buf.len()) % FREE_REGISTER_SPACE;
                }
            }
            Op::Write { reg, data } => {
                if bus.write_reg_buf(reg, &data).is_ok() {
                    shadow[index..index + data.len()].copy_from_slice(&data);
                    index = (index + data.len()) % FREE_REGISTER_SPACE;
                }
            }
        }
        assert_eq!(bus.space(), &shadow);
    }
});
