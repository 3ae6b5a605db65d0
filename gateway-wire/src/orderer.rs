//! Ordering endpoint messages and client (`ledger.orderer`).

/// Acknowledgement for one broadcast envelope.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BroadcastResponse {
    /// One of `common::Status`; `Success` means accepted for ordering,
    /// which is not a commitment guarantee.
    #[prost(enumeration = "crate::common::Status", tag = "1")]
    pub status: i32,
    /// Human-readable detail when the envelope was rejected.
    #[prost(string, tag = "2")]
    pub info: String,
}

/// Client for the `ledger.orderer.AtomicBroadcast` service.
pub mod atomic_broadcast_client {
    #![allow(unused_variables, dead_code, missing_docs, clippy::wildcard_imports)]
    use tonic::codegen::*;

    #[derive(Debug, Clone)]
    pub struct AtomicBroadcastClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl AtomicBroadcastClient<tonic::transport::Channel> {
        /// Attempt to create a new client by connecting to a given endpoint.
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> AtomicBroadcastClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::Error: Into<StdError>,
        T::ResponseBody: Body<Data = Bytes> + Send + 'static,
        <T::ResponseBody as Body>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub async fn broadcast(
            &mut self,
            request: impl tonic::IntoStreamingRequest<Message = crate::common::Envelope>,
        ) -> std::result::Result<
            tonic::Response<tonic::codec::Streaming<super::BroadcastResponse>>,
            tonic::Status,
        > {
            self.inner
                .ready()
                .await
                .map_err(|e| {
                    tonic::Status::new(
                        tonic::Code::Unknown,
                        format!("Service was not ready: {}", e.into()),
                    )
                })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/ledger.orderer.AtomicBroadcast/Broadcast",
            );
            let mut req = request.into_streaming_request();
            req.extensions_mut().insert(GrpcMethod::new(
                "ledger.orderer.AtomicBroadcast",
                "Broadcast",
            ));
            self.inner.streaming(req, path, codec).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Status;
    use prost::Message;

    #[test]
    fn test_broadcast_response_round_trip() {
        let response = BroadcastResponse {
            status: Status::Success as i32,
            info: String::new(),
        };

        let bytes = response.encode_to_vec();
        let decoded = BroadcastResponse::decode(bytes.as_slice()).unwrap();

        assert_eq!(decoded, response);
        assert_eq!(decoded.status(), Status::Success);
    }
}
