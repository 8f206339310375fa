use mldata_error::{to_compute_err, MlDataResult};

pub fn serialize_into_writer<W, T>(writer: W, value: &T) -> MlDataResult<()>
where
    W: std::io::Write,
    T: serde::ser::Serialize,
{
    bincode::serialize_into(writer, value).map_err(to_compute_err)
}

pub fn deserialize_from_reader<T, R>(reader: R) -> MlDataResult<T>
where
    T: serde::de::DeserializeOwned,
    R: std::io::Read,
{
    bincode::deserialize_from(reader).map_err(to_compute_err)
}

pub fn serialize_to_bytes<T>(value: &T) -> MlDataResult<Vec<u8>>
where
    T: serde::ser::Serialize,
{
    let mut v = vec![];

    serialize_into_writer(&mut v, value)?;

    Ok(v)
}

pub fn deserialize_from_bytes<T>(bytes: &[u8]) -> MlDataResult<T>
where
    T: serde::de::DeserializeOwned,
{
    deserialize_from_reader(bytes)
}
