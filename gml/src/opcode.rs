//! Opcodes of the deferred calls, generated from the command table.

macro_rules! define_opcodes {
    (
        fixed { $($op:ident => fn $name:ident($($arg:ident: $ty:ty),*);)* }
        query { $($qop:ident => fn $qname:ident($($qarg:ident: $qty:ty),*) -> $ret:ty;)* }
        special { $($sop:ident,)* }
    ) => {
        /// Identifies the call encoded in a record.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[allow(missing_docs)]
        pub enum Opcode {
            $($op,)*
            $($qop,)*
            $($sop,)*
        }

        impl Opcode {
            /// Every opcode, in discriminant order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$op,)* $(Opcode::$qop,)* $(Opcode::$sop,)*];

            /// The name of the call, as used in logs.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Opcode::$op => stringify!($op),)*
                    $(Opcode::$qop => stringify!($qop),)*
                    $(Opcode::$sop => stringify!($sop),)*
                }
            }
        }
    };
}

gl_backend::for_each_gl_command!(define_opcodes);

impl Opcode {
    /// Parses the opcode of a record header.
    pub fn from_raw(raw: u16) -> Option<Opcode> {
        Opcode::ALL.get(usize::from(raw)).copied()
    }

    /// The value stored in record headers.
    pub const fn raw(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::Opcode;

    #[test]
    fn raw_values_round_trip() {
        for (i, opcode) in Opcode::ALL.iter().enumerate() {
            assert_eq!(i, usize::from(opcode.raw()));
            assert_eq!(Some(*opcode), Opcode::from_raw(opcode.raw()));
        }
        assert_eq!(None, Opcode::from_raw(Opcode::ALL.len() as u16));
    }

    #[test]
    fn names_match_the_table() {
        assert_eq!("BindTexture", Opcode::BindTexture.name());
        assert_eq!("IsTexture", Opcode::IsTexture.name());
        assert_eq!("DrawElements", Opcode::DrawElements.name());
    }
}
