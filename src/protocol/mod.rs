/*!
 * Object-store protocols
 *
 * S3 (and S3-compatible stores) is the only protocol; its client sits behind
 * the `MultipartStore` trait so the upload logic can run against any store.
 */

pub mod s3;
