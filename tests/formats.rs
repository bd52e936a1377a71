use std::fs;
use std::path::PathBuf;

use ndarray::array;

fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("writing the fixture should succeed");
    path
}

#[cfg(feature = "fisher")]
mod fisher {
    use super::*;
    use annotate_rs::formats::fisher::{ActiveSpeakers, AllCallData, Annotations};
    use annotate_rs::{Advisory, FormatError};

    const TRANSCRIPT: &str = "\
# fe_03_00001
0.0 2.0 A: hello there
1.5 3.0 B: yes
3.5 4.25 A: bye
";

    const CALL_TABLE: &str = "\
CALL_ID,DATE_TIME,TOPICID,SIG_GRADE,CONV_GRADE,APIN,ASX.DL,AED,ACNT,APHSET,BPIN,BSX.DL,BED,BCNT,BPHSET
00001,20050101,ENG01,1.5,2.0,75520,f.a,x,y,cell,75521,m.n,x,y,land
";

    #[test]
    fn transcript_parses_into_ordered_seconds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "fe_03_00001.txt", TRANSCRIPT);

        let ann = Annotations::from_file(&path, None).expect("parse should succeed");
        assert_eq!(ann.labels().samplerate(), 1.0);
        assert_eq!(
            ann.labels().starts_ends(),
            [(0.0, 2.0), (1.5, 3.0), (3.5, 4.25)]
        );
        assert_eq!(ann.labels().labels()[1].channel, 1);
        assert_eq!(ann.labels().labels()[1].content, "yes");
        assert_eq!(ann.callid().as_deref(), Some("00001"));
    }

    #[test]
    fn call_table_attaches_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table_path = write_file(&dir, "calldata.tbl", CALL_TABLE);
        let transcript_path = write_file(&dir, "fe_03_00001.txt", TRANSCRIPT);

        let table = AllCallData::from_file(&table_path).expect("call table should parse");
        let call = table
            .calldata_for_filename(&transcript_path)
            .expect("callid 00001 should be present");
        assert_eq!(call.topicid, "ENG01");
        assert_eq!(call.signal_grade, 1.5);
        assert_eq!(call.speakers[0].gender, "f");
        assert_eq!(call.speakers[0].dialect, "a");
        assert_eq!(call.speakers[1].pin, "75521");
        assert_eq!(call.speakers[1].phone_service, "land");

        let ann = Annotations::from_file(&transcript_path, Some(&table)).expect("parse succeeds");
        assert_eq!(ann.calldata.as_ref().map(|c| c.callid.as_str()), Some("00001"));
    }

    #[test]
    fn active_speakers_compress_to_channel_segments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "fe_03_00001.txt", TRANSCRIPT);

        let active = ActiveSpeakers::from_file(&path, 100, None).expect("pipeline succeeds");
        assert!(active.advisories.is_empty());

        let labels = active.labels();
        assert_eq!(labels.samplerate(), 100.0);
        assert_eq!(labels.duration(), 425.0);
        assert_eq!(
            labels.starts_ends(),
            [
                (0.0, 150.0),
                (150.0, 200.0),
                (200.0, 300.0),
                (300.0, 350.0),
                (350.0, 425.0),
            ]
        );
        assert_eq!(
            labels.labels(),
            [
                array![1, 0],
                array![1, 1],
                array![0, 1],
                array![0, 0],
                array![1, 0],
            ]
        );
    }

    #[test]
    fn overlapping_same_channel_annotations_raise_an_advisory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(
            &dir,
            "fe_03_00002.txt",
            "0.0 2.0 A: first\n1.0 3.0 A: second\n",
        );

        let active = ActiveSpeakers::from_file(&path, 100, None).expect("pipeline succeeds");
        assert!(matches!(
            active.advisories.as_slice(),
            [Advisory::DuplicateAnnotation { .. }]
        ));
        // Clipped to binary: one run of channel A activity.
        assert_eq!(active.labels().starts_ends(), [(0.0, 300.0)]);
        assert_eq!(active.labels().labels(), [array![1, 0]]);
    }

    #[test]
    fn unknown_speaker_channel_is_a_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "fe_03_00003.txt", "0.0 1.0 C: who\n");

        let result = Annotations::from_file(&path, None);
        assert!(matches!(result, Err(FormatError::Parse { line: 1, .. })));
    }
}

#[cfg(feature = "ka3")]
mod ka3 {
    use super::*;
    use annotate_rs::formats::ka3::{ActiveSpeakers, Annotations};

    const MPEG7: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Mpeg7 xmlns="urn:mpeg:mpeg7:schema:2004"
       xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
       xmlns:ifinder="http://www.iais.fraunhofer.de/ifinder">
  <Description>
    <AudioSegment>
      <MediaTime>
        <MediaTimePoint>T00:00:00:0F1000</MediaTimePoint>
        <MediaDuration>PT00H00M02S500N1000F</MediaDuration>
      </MediaTime>
      <AudioDescriptor xsi:type="ifinder:SpokenContentType">
        <ifinder:Identifier>spk1</ifinder:Identifier>
        <ifinder:Speaker gender="female">
          <GivenName>Anna</GivenName>
        </ifinder:Speaker>
        <ifinder:SpokenUnitVector>hello world</ifinder:SpokenUnitVector>
        <ifinder:ConfidenceVector>0.9</ifinder:ConfidenceVector>
      </AudioDescriptor>
    </AudioSegment>
    <AudioSegment>
      <MediaTime>
        <MediaTimePoint>T00:00:02:500F1000</MediaTimePoint>
        <MediaDuration>PT00H00M01S0N1000F</MediaDuration>
      </MediaTime>
      <AudioDescriptor xsi:type="ifinder:SpokenContentType">
        <ifinder:Identifier>spk2</ifinder:Identifier>
        <ifinder:Speaker gender="male">
          <GivenName>Ben</GivenName>
        </ifinder:Speaker>
        <ifinder:SpokenUnitVector>hi</ifinder:SpokenUnitVector>
        <ifinder:ConfidenceVector>0.8 0.7</ifinder:ConfidenceVector>
      </AudioDescriptor>
    </AudioSegment>
    <AudioSegment>
      <MediaTime>
        <MediaTimePoint>T00:00:03:500F1000</MediaTimePoint>
        <MediaDuration>PT00H00M01S0N1000F</MediaDuration>
      </MediaTime>
    </AudioSegment>
  </Description>
</Mpeg7>
"#;

    #[test]
    fn mpeg7_segments_parse_with_speaker_roster() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "recording.xml", MPEG7);

        let ann = Annotations::from_file(&path).expect("parse should succeed");
        // The third segment has no descriptor, so it carries no speech.
        assert_eq!(ann.labels().len(), 2);
        assert_eq!(ann.labels().starts_ends(), [(0.0, 2.5), (2.5, 3.5)]);

        assert_eq!(ann.speakers.len(), 2);
        assert_eq!(ann.speakers[0].id, "spk1");
        assert_eq!(ann.speakers[0].gender, "female");
        assert_eq!(ann.speakers[1].givenname, "Ben");

        let transcriptions = ann.labels().labels();
        assert_eq!(transcriptions[0].content, "hello world");
        assert_eq!(transcriptions[0].confidence, 0.9);
        // Only the leading confidence value is kept.
        assert_eq!(transcriptions[1].confidence, 0.8);

        let spk2_indices: Vec<usize> = ann.indices_for_speaker(&ann.speakers[1]).collect();
        assert_eq!(spk2_indices, [1]);
    }

    #[test]
    fn active_speakers_use_one_channel_per_speaker() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "recording.xml", MPEG7);

        let active = ActiveSpeakers::from_file(&path, 100).expect("pipeline succeeds");
        assert!(active.advisories.is_empty());
        assert_eq!(active.speakers.len(), 2);

        let labels = active.labels();
        assert_eq!(labels.duration(), 350.0);
        assert_eq!(labels.starts_ends(), [(0.0, 250.0), (250.0, 350.0)]);
        assert_eq!(labels.labels(), [array![1, 0], array![0, 1]]);
    }
}

#[cfg(feature = "timit")]
mod timit {
    use super::*;
    use annotate_rs::formats::timit::{ActiveSpeakers, Annotations, DEFAULT_SAMPLERATE};

    #[test]
    fn boundary_files_parse_at_sixteen_kilohertz() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "sa1.phn", "0 8 h#\n8 12 sh\n12 16 iy\n");

        let ann =
            Annotations::from_file(&path, f64::from(DEFAULT_SAMPLERATE)).expect("parse succeeds");
        assert_eq!(ann.labels().samplerate(), 16_000.0);
        assert_eq!(ann.labels().labels(), ["h#", "sh", "iy"]);
        assert_eq!(ann.labels().duration(), 16.0);
    }

    #[test]
    fn activity_collapses_to_a_single_channel() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_file(&dir, "sa1.phn", "0 8 h#\n8 12 sh\n12 16 iy\n");

        let active = ActiveSpeakers::from_file(&path, DEFAULT_SAMPLERATE).expect("pipeline");
        assert!(active.advisories.is_empty());
        assert_eq!(active.labels().starts_ends(), [(0.0, 16.0)]);
        assert_eq!(active.labels().labels(), [array![1]]);
    }

    #[test]
    fn overlay_builds_a_two_speaker_conversation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write_file(&dir, "sa1.phn", "0 8 h#\n8 16 iy\n");
        // The partner speaks in [0, 4) and [8, 12), with a gap between.
        let second = write_file(&dir, "sa2.phn", "0 4 sh\n8 12 ix\n");

        let primary = ActiveSpeakers::from_file(&first, DEFAULT_SAMPLERATE).expect("pipeline");
        let secondary = ActiveSpeakers::from_file(&second, DEFAULT_SAMPLERATE).expect("pipeline");

        let joined = primary
            .overlay(&secondary, DEFAULT_SAMPLERATE)
            .expect("overlay succeeds");
        assert!(joined.advisories.is_empty());
        assert_eq!(joined.labels().duration(), primary.labels().duration());
        assert_eq!(
            joined.labels().starts_ends(),
            [(0.0, 4.0), (4.0, 8.0), (8.0, 12.0), (12.0, 16.0)]
        );
        assert_eq!(
            joined.labels().labels(),
            [array![1, 1], array![1, 0], array![1, 1], array![1, 0]]
        );
    }

    #[test]
    fn overlay_clips_a_longer_partner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = write_file(&dir, "sa1.phn", "0 8 h#\n");
        let second = write_file(&dir, "sa2.phn", "0 20 sh\n");

        let primary = ActiveSpeakers::from_file(&first, DEFAULT_SAMPLERATE).expect("pipeline");
        let secondary = ActiveSpeakers::from_file(&second, DEFAULT_SAMPLERATE).expect("pipeline");

        let joined = primary
            .overlay(&secondary, DEFAULT_SAMPLERATE)
            .expect("overlay succeeds");
        assert_eq!(joined.labels().duration(), 8.0);
        assert_eq!(joined.labels().starts_ends(), [(0.0, 8.0)]);
        assert_eq!(joined.labels().labels(), [array![1, 1]]);
    }
}
