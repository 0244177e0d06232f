use nom::{
	combinator::map,
	error::ParseError,
	IResult,
	multi::length_data,
	number::complete::{
		le_u32,
		u8
	}
};

/// Parses a Pascal style string (1-byte length prefix). Invalid UTF-8 is replaced.
pub fn pstr<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], String, E>
where
	E: ParseError<&'a [u8]>
{
	map(length_data(u8), |b: &[u8]| String::from_utf8_lossy(b).into_owned())(input)
}

/// Parses a byte blob with a 4-byte little endian length prefix
pub fn lbytes<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], &'a [u8], E>
where
	E: ParseError<&'a [u8]>
{
	length_data(le_u32)(input)
}

/// Parses a string with a 4-byte little endian length prefix. This is not null terminated and may
/// contain null bytes. Invalid UTF-8 is replaced.
pub fn lstr<'a, E>(input: &'a [u8]) -> IResult<&'a [u8], String, E>
where
	E: ParseError<&'a [u8]>
{
	map(lbytes, |b: &[u8]| String::from_utf8_lossy(b).into_owned())(input)
}

#[cfg(test)]
mod tests {
	use nom::error::Error;

	#[test]
	fn test_pstr() {
		let data = &b"\x04test123454321"[..];
		assert_eq!(super::pstr::<Error<&[u8]>>(data), Ok((&b"123454321"[..], "test".to_string())));
	}

	#[test]
	fn test_lstr() {
		let data = &b"\x06\x00\x00\x00Cube\x00\x01Model"[..];
		assert_eq!(super::lstr::<Error<&[u8]>>(data), Ok((&b"Model"[..], "Cube\x00\x01".to_string())));
	}

	#[test]
	fn test_lbytes_short() {
		let data = &b"\x08\x00\x00\x00abc"[..];
		assert!(super::lbytes::<Error<&[u8]>>(data).is_err());
	}
}
