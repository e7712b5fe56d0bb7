/// Separator placed between the parts of a multi-value cache key.
///
/// Parts that themselves contain the separator can collide with a different
/// argument list (`("a|b",)` and `("a", "b")` both produce `"a|b"`). Callers
/// whose key parts may contain `|` should pre-format their own key.
pub const KEY_SEPARATOR: char = '|';

/// Trait for generating cache keys.
///
/// Every key handed to a memoizer goes through this trait, so callers can
/// pass a ready-made string, a primitive, or a tuple of values and get a
/// deterministic `String` back.
///
/// # Examples
///
/// ```
/// use memoizer_core::CacheableKey;
///
/// assert_eq!("user:42".to_cache_key(), "user:42");
/// assert_eq!(("user", 42).to_cache_key(), "user|42");
/// assert_ne!(("a", 1).to_cache_key(), ("a", 2).to_cache_key());
/// ```
///
/// Custom types implement it directly:
///
/// ```
/// use memoizer_core::CacheableKey;
///
/// struct UserId(u64);
///
/// impl CacheableKey for UserId {
///     fn to_cache_key(&self) -> String {
///         format!("user:{}", self.0)
///     }
/// }
///
/// assert_eq!(UserId(7).to_cache_key(), "user:7");
/// ```
pub trait CacheableKey {
    /// Returns the string this value is stored under.
    fn to_cache_key(&self) -> String;
}

impl CacheableKey for str {
    fn to_cache_key(&self) -> String {
        self.to_owned()
    }
}

impl CacheableKey for String {
    fn to_cache_key(&self) -> String {
        self.clone()
    }
}

impl<T: CacheableKey + ?Sized> CacheableKey for &T {
    fn to_cache_key(&self) -> String {
        (**self).to_cache_key()
    }
}

macro_rules! impl_display_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl CacheableKey for $t {
                fn to_cache_key(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_display_key!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
);

impl<T: CacheableKey> CacheableKey for [T] {
    fn to_cache_key(&self) -> String {
        join_key_parts(self.iter().map(T::to_cache_key))
    }
}

impl<T: CacheableKey> CacheableKey for Vec<T> {
    fn to_cache_key(&self) -> String {
        self.as_slice().to_cache_key()
    }
}

macro_rules! impl_tuple_key {
    ($($name:ident)+) => {
        impl<$($name: CacheableKey),+> CacheableKey for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_cache_key(&self) -> String {
                let ($($name,)+) = self;
                join_key_parts([$($name.to_cache_key()),+])
            }
        }
    };
}

impl_tuple_key!(A);
impl_tuple_key!(A B);
impl_tuple_key!(A B C);
impl_tuple_key!(A B C D);
impl_tuple_key!(A B C D E);
impl_tuple_key!(A B C D E F);
impl_tuple_key!(A B C D E F G);
impl_tuple_key!(A B C D E F G H);

/// Joins already-formed key parts with [`KEY_SEPARATOR`].
///
/// # Examples
///
/// ```
/// use memoizer_core::join_key_parts;
///
/// let key = join_key_parts(["tenant".to_string(), "7".to_string()]);
/// assert_eq!(key, "tenant|7");
///
/// let empty = join_key_parts(Vec::<String>::new());
/// assert_eq!(empty, "");
/// ```
pub fn join_key_parts<I>(parts: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut key = String::new();
    for (index, part) in parts.into_iter().enumerate() {
        if index > 0 {
            key.push(KEY_SEPARATOR);
        }
        key.push_str(&part);
    }
    key
}

/// Builds a cache key from one or more values using their `Display` output.
///
/// Each argument is stringified with [`ToString`] and the parts are joined with
/// [`KEY_SEPARATOR`]. Values are taken by reference.
///
/// # Examples
///
/// ```
/// use memoizer_core::cache_key;
///
/// let id = 42;
/// assert_eq!(cache_key!("user", id), "user|42");
/// assert_eq!(cache_key!("single"), "single");
/// assert_ne!(cache_key!("a", 1), cache_key!("a", 2));
/// ```
#[macro_export]
macro_rules! cache_key {
    ($($part:expr),+ $(,)?) => {
        $crate::join_key_parts([$(::std::string::ToString::to_string(&$part)),+])
    };
}
