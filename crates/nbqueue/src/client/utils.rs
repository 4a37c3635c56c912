/// Creates a newtype that parses a CLI argument with `$parser`, so that types without a
/// [`std::str::FromStr`] implementation (e.g. [`std::time::Duration`]) can be used as arguments.
#[macro_export]
macro_rules! arg_wrapper {
    ($name:ident, $wrapped_type:ty, $parser:expr) => {
        #[derive(Clone, Debug)]
        pub struct $name($wrapped_type);

        impl ::std::str::FromStr for $name {
            type Err = ::anyhow::Error;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                ::std::result::Result::Ok(Self($parser(s)?))
            }
        }

        impl $name {
            pub fn unpack(self) -> $wrapped_type {
                self.0
            }
        }
    };
}
