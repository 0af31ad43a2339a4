//! Upload document glue for the repository's dataset endpoint.
//!
//! [`to_xml`] renders the `oml:data_set_description` document,
//! [`file_elements`] collects the raw ARFF bytes to attach and
//! [`parse_publish_response`] reads back the id the server assigned.

use crate::dataset::{Dataset, DatasetDescriptor};
use crate::error::{DatasetError, Result};
use crate::io::arff::ArffReader;
use serde::{Deserialize, Serialize};

pub const OML_NAMESPACE: &str = "http://openml.org/openml";

#[derive(Serialize)]
#[serde(rename = "oml:data_set_description")]
struct Description<'a> {
    #[serde(rename = "@xmlns:oml")]
    xmlns: &'static str,
    #[serde(rename = "oml:id", skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(rename = "oml:name")]
    name: &'a str,
    #[serde(rename = "oml:version", skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(rename = "oml:description", skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(rename = "oml:format")]
    format: &'static str,
    #[serde(rename = "oml:creator", skip_serializing_if = "Option::is_none")]
    creator: Option<&'a str>,
    #[serde(rename = "oml:contributor", skip_serializing_if = "Option::is_none")]
    contributor: Option<&'a str>,
    #[serde(rename = "oml:collection_date", skip_serializing_if = "Option::is_none")]
    collection_date: Option<&'a str>,
    #[serde(rename = "oml:upload_date", skip_serializing_if = "Option::is_none")]
    upload_date: Option<&'a str>,
    #[serde(rename = "oml:language", skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(rename = "oml:licence", skip_serializing_if = "Option::is_none")]
    licence: Option<&'a str>,
    #[serde(rename = "oml:url", skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(rename = "oml:default_target_attribute", skip_serializing_if = "Option::is_none")]
    default_target_attribute: Option<&'a str>,
    #[serde(rename = "oml:row_id_attribute", skip_serializing_if = "Option::is_none")]
    row_id_attribute: Option<&'a str>,
    #[serde(rename = "oml:ignore_attribute", skip_serializing_if = "Option::is_none")]
    ignore_attribute: Option<&'a [String]>,
    #[serde(rename = "oml:version_label", skip_serializing_if = "Option::is_none")]
    version_label: Option<&'a str>,
    #[serde(rename = "oml:citation", skip_serializing_if = "Option::is_none")]
    citation: Option<&'a str>,
    #[serde(rename = "oml:tag", skip_serializing_if = "Option::is_none")]
    tag: Option<&'a [String]>,
    #[serde(rename = "oml:visibility", skip_serializing_if = "Option::is_none")]
    visibility: Option<&'a str>,
    #[serde(rename = "oml:original_data_url", skip_serializing_if = "Option::is_none")]
    original_data_url: Option<&'a str>,
    #[serde(rename = "oml:paper_url", skip_serializing_if = "Option::is_none")]
    paper_url: Option<&'a str>,
    #[serde(rename = "oml:update_comment", skip_serializing_if = "Option::is_none")]
    update_comment: Option<&'a str>,
    #[serde(rename = "oml:md5_checksum", skip_serializing_if = "Option::is_none")]
    md5_checksum: Option<&'a str>,
}

impl<'a> From<&'a DatasetDescriptor> for Description<'a> {
    fn from(d: &'a DatasetDescriptor) -> Self {
        Self {
            xmlns: OML_NAMESPACE,
            id: d.id,
            name: &d.name,
            version: d.version,
            description: d.description.as_deref(),
            format: d.format.as_str(),
            creator: d.creator.as_deref(),
            contributor: d.contributor.as_deref(),
            collection_date: d.collection_date.as_deref(),
            upload_date: d.upload_date.as_deref(),
            language: d.language.as_deref(),
            licence: d.licence.as_deref(),
            url: d.url.as_deref(),
            default_target_attribute: d.default_target_attribute.as_deref(),
            row_id_attribute: d.row_id_attribute.as_deref(),
            ignore_attribute: d.ignore_attribute.as_deref(),
            version_label: d.version_label.as_deref(),
            citation: d.citation.as_deref(),
            tag: d.tag.as_deref(),
            visibility: d.visibility.as_deref(),
            original_data_url: d.original_data_url.as_deref(),
            paper_url: d.paper_url.as_deref(),
            update_comment: d.update_comment.as_deref(),
            md5_checksum: d.md5_checksum.as_deref(),
        }
    }
}

/// Render the upload description of `descriptor`. Absent fields are omitted.
///
/// # Errors
/// [`DatasetError::Format`] if serialization fails.
pub fn to_xml(descriptor: &DatasetDescriptor) -> Result<String> {
    quick_xml::se::to_string(&Description::from(descriptor))
        .map_err(|e| DatasetError::Format(format!("cannot serialize dataset description: {e}")))
}

/// Raw ARFF bytes to upload with the description.
///
/// Returns `None` when the dataset only has a URL, which the server fetches
/// itself.
///
/// # Errors
/// [`DatasetError::Validation`] when the data file is not valid ARFF or
/// there is neither a data file nor a URL.
pub fn file_elements(dataset: &Dataset) -> Result<Option<Vec<u8>>> {
    let descriptor = dataset.descriptor();
    if let Some(inline) = &descriptor.dataset {
        return Ok(Some(inline.as_bytes().to_vec()));
    }
    if let Some(path) = &descriptor.data_file
        && path.is_file()
    {
        let bytes = std::fs::read(path).map_err(|e| DatasetError::io("read", path, e))?;
        ArffReader::new(bytes.as_slice())
            .and_then(ArffReader::read_dense)
            .map_err(|e| {
                DatasetError::Validation(format!(
                    "the file you have provided is not a valid arff file: {e}"
                ))
            })?;
        return Ok(Some(bytes));
    }
    if descriptor.url.is_none() {
        return Err(DatasetError::Validation(
            "no valid url/path to the data file was given".into(),
        ));
    }
    Ok(None)
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(alias = "oml:id")]
    id: u64,
}

/// Extract the new dataset id from an `oml:upload_data_set` response.
///
/// # Errors
/// [`DatasetError::Format`] for responses without a numeric id.
pub fn parse_publish_response(xml: &str) -> Result<u64> {
    quick_xml::de::from_str::<UploadResponse>(xml)
        .map(|r| r.id)
        .map_err(|e| DatasetError::Format(format!("unexpected upload response: {e}")))
}

/// Record the id from an upload response on `dataset`.
///
/// # Errors
/// See [`parse_publish_response`].
pub fn apply_publish_response(dataset: &mut Dataset, xml: &str) -> Result<u64> {
    let id = parse_publish_response(xml)?;
    dataset.set_id(id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_fields_are_ordered_and_sparse() {
        let mut d = DatasetDescriptor::new("iris");
        d.description = Some("Fisher's iris data".into());
        d.licence = Some("Public".into());
        d.ignore_attribute = Some(vec!["a".into(), "b".into()]);
        let xml = to_xml(&d).unwrap();

        assert!(xml.starts_with(r#"<oml:data_set_description xmlns:oml="http://openml.org/openml">"#));
        let pos = |tag: &str| xml.find(tag).unwrap();
        assert!(pos("<oml:name>iris</oml:name>") < pos("<oml:description>"));
        assert!(pos("<oml:description>") < pos("<oml:format>arff</oml:format>"));
        assert!(pos("<oml:format>") < pos("<oml:licence>Public</oml:licence>"));
        assert!(pos("<oml:licence>") < pos("<oml:ignore_attribute>a</oml:ignore_attribute>"));
        assert_eq!(xml.matches("<oml:ignore_attribute>").count(), 2);
        assert!(!xml.contains("<oml:id>"));
        assert!(!xml.contains("<oml:creator>"));
    }

    #[test]
    fn upload_response_id() {
        let xml = r#"<oml:upload_data_set xmlns:oml="http://openml.org/openml">
            <oml:id>40945</oml:id>
        </oml:upload_data_set>"#;
        assert_eq!(parse_publish_response(xml).unwrap(), 40945);
        assert!(parse_publish_response("<oml:upload_data_set/>").is_err());
    }
}
