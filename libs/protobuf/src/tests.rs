use anyhow::Context as _;

use super::*;

#[derive(Clone, PartialEq, prost::Message)]
struct PointProto {
    #[prost(uint64, optional, tag = "1")]
    x: Option<u64>,
    #[prost(uint64, optional, tag = "2")]
    y: Option<u64>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct PathProto {
    #[prost(message, optional, tag = "1")]
    start: Option<PointProto>,
    #[prost(message, repeated, tag = "2")]
    steps: Vec<PointProto>,
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    x: u64,
    y: u64,
}

#[derive(Debug, Clone, PartialEq)]
struct Path {
    start: Point,
    steps: Vec<Point>,
}

impl ProtoFmt for Point {
    type Proto = PointProto;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            x: *required(&r.x).context("x")?,
            y: *required(&r.y).context("y")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            x: Some(self.x),
            y: Some(self.y),
        }
    }
}

impl ProtoFmt for Path {
    type Proto = PathProto;
    fn read(r: &Self::Proto) -> anyhow::Result<Self> {
        Ok(Self {
            start: read_required(&r.start).context("start")?,
            steps: read_repeated(&r.steps).context("steps")?,
        })
    }
    fn build(&self) -> Self::Proto {
        Self::Proto {
            start: Some(self.start.build()),
            steps: self.steps.iter().map(ProtoFmt::build).collect(),
        }
    }
}

#[test]
fn test_nested_message() {
    testonly::test_encode(&Path {
        start: Point { x: 1, y: 2 },
        steps: vec![Point { x: 3, y: 4 }, Point { x: 0, y: 0 }],
    });
}

#[test]
fn test_missing_required_field() {
    let bytes = prost::Message::encode_to_vec(&PathProto {
        start: None,
        steps: vec![],
    });
    let err = decode::<Path>(&bytes).unwrap_err();
    assert!(format!("{err:#}").contains("start"), "{err:#}");

    let bytes = prost::Message::encode_to_vec(&PathProto {
        start: Some(PointProto {
            x: Some(1),
            y: Some(1),
        }),
        steps: vec![PointProto { x: Some(1), y: None }],
    });
    let err = decode::<Path>(&bytes).unwrap_err();
    assert!(format!("{err:#}").contains("[0]"), "{err:#}");
}

#[test]
fn test_optional_field() {
    let absent: Option<Point> = read_optional(&None).unwrap();
    assert_eq!(absent, None);
    let present: Option<Point> = read_optional(&Some(PointProto {
        x: Some(7),
        y: Some(8),
    }))
    .unwrap();
    assert_eq!(present, Some(Point { x: 7, y: 8 }));
}
