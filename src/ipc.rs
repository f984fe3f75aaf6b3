//! Control Commands
//!
//! Wire words for the cross-process control channel. A command is a 28-bit
//! code; bits 28..32 carry an optional boolean argument. The transport (named
//! pipe or an out-of-band wheel event) belongs to the host; this module owns
//! encode/decode and the set of commands the core honors.

/// 28-bit command code space.
const COMMAND_BASE: u32 = 0x0573_1057 & 0x0FFF_FFFF;

const CMD_EXIT: u32 = COMMAND_BASE + 1;
const CMD_PASS_MODE: u32 = COMMAND_BASE + 2;
const CMD_RELOAD: u32 = COMMAND_BASE + 3;
const CMD_RESET_STATE: u32 = COMMAND_BASE + 4;

const BOOL_BIT: u32 = 0x1000_0000;
const BOOL_MASK: u32 = 0xF000_0000;
const CODE_MASK: u32 = 0x0FFF_FFFF;

/// Control messages the core honors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Shut the program down.
    Exit,
    /// Enable or disable pass mode.
    SetPassMode(bool),
    /// Reload the selected profile from disk.
    ReloadProfile,
    /// Reset all classifier and scroll state.
    ResetState,
}

impl ControlCommand {
    /// Encode to the 32-bit wire word.
    pub fn encode(self) -> u32 {
        match self {
            ControlCommand::Exit => CMD_EXIT,
            ControlCommand::SetPassMode(on) => CMD_PASS_MODE | if on { BOOL_BIT } else { 0 },
            ControlCommand::ReloadProfile => CMD_RELOAD,
            ControlCommand::ResetState => CMD_RESET_STATE,
        }
    }

    /// Decode a wire word; unknown codes yield None.
    pub fn decode(word: u32) -> Option<ControlCommand> {
        let flag = (word & BOOL_MASK) != 0;
        match word & CODE_MASK {
            CMD_EXIT => Some(ControlCommand::Exit),
            CMD_PASS_MODE => Some(ControlCommand::SetPassMode(flag)),
            CMD_RELOAD => Some(ControlCommand::ReloadProfile),
            CMD_RESET_STATE => Some(ControlCommand::ResetState),
            _ => None,
        }
    }

    /// Parse a `--send*` command-line form.
    pub fn from_args(cmd: &str, arg: Option<&str>) -> Option<ControlCommand> {
        match cmd {
            "--sendExit" => Some(ControlCommand::Exit),
            "--sendPassMode" => {
                let on = arg.map(|a| a.eq_ignore_ascii_case("true")).unwrap_or(true);
                Some(ControlCommand::SetPassMode(on))
            }
            "--sendReloadProp" => Some(ControlCommand::ReloadProfile),
            "--sendInitState" => Some(ControlCommand::ResetState),
            _ => None,
        }
    }
}
