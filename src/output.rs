// src/output.rs - CSV and JSON reports

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::errors::Result;
use crate::mask2d::Mask2D;
use crate::pipeline::MaskSummary;

fn report_path(output_dir: &Path, subdir: &str, filename: &str) -> Result<PathBuf> {
    let dir = output_dir.join(subdir);
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!("{}.csv", filename)))
}

/// Write an ordered contour to `contours/<filename>.csv`
pub fn write_contour_csv<P: AsRef<Path>>(
    points: &[(i32, i32)],
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = report_path(output_dir.as_ref(), "contours", filename)?;
    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record(["Point_Index", "X", "Y"])?;
    for (index, (x, y)) in points.iter().enumerate() {
        writer.write_record(&[index.to_string(), x.to_string(), y.to_string()])?;
    }

    writer.flush()?;
    Ok(output_path)
}

/// Write one row per component to `components/<filename>.csv`
pub fn write_components_csv<P: AsRef<Path>>(
    components: &[Mask2D],
    output_dir: P,
    filename: &str,
) -> Result<PathBuf> {
    let output_path = report_path(output_dir.as_ref(), "components", filename)?;
    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "Component_Index",
        "Bounds_X",
        "Bounds_Y",
        "Bounds_Width",
        "Bounds_Height",
        "Point_Count",
        "Perimeter",
    ])?;

    for (index, component) in components.iter().enumerate() {
        let b = component.bounds();
        writer.write_record(&[
            index.to_string(),
            b.x.to_string(),
            b.y.to_string(),
            b.width.to_string(),
            b.height.to_string(),
            component.point_count().to_string(),
            format!("{:.6}", component.perimeter()),
        ])?;
    }

    writer.flush()?;
    Ok(output_path)
}

/// Write every summary row to `summary.csv`
pub fn write_summary_csv<P: AsRef<Path>>(summaries: &[MaskSummary], output_dir: P) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("summary.csv");
    let mut writer = Writer::from_path(&output_path)?;

    for summary in summaries {
        writer.serialize(summary)?;
    }

    writer.flush()?;
    Ok(output_path)
}

/// Write every summary row to `summary.json`
pub fn write_summary_json<P: AsRef<Path>>(summaries: &[MaskSummary], output_dir: P) -> Result<PathBuf> {
    let output_path = output_dir.as_ref().join("summary.json");
    let writer = BufWriter::new(File::create(&output_path)?);
    serde_json::to_writer_pretty(writer, summaries)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Bounds2D;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("roi_mask_out_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_contour_csv_rows() {
        let dir = scratch_dir("contour");
        let path = write_contour_csv(&[(1, 2), (2, 2)], &dir, "leaf").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_dir_all(&dir);

        assert!(path.ends_with("contours/leaf.csv"));
        assert_eq!(content, "Point_Index,X,Y\n0,1,2\n1,2,2\n");
    }

    #[test]
    fn test_components_csv_rows() {
        let dir = scratch_dir("components");
        let parts = vec![Mask2D::filled(Bounds2D::new(0, 0, 2, 2)), Mask2D::from_points(&[(9, 9)])];
        let path = write_components_csv(&parts, &dir, "leaf").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let _ = fs::remove_dir_all(&dir);

        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,0,0,2,2,4,"));
        assert!(lines[2].starts_with("1,9,9,1,1,1,3.14159"));
    }

    #[test]
    fn test_summary_reports() {
        let dir = scratch_dir("summary");
        fs::create_dir_all(&dir).unwrap();
        let rows = vec![MaskSummary {
            filename: "leaf".to_string(),
            subfolder: "root".to_string(),
            image_width: 4,
            image_height: 4,
            bounds_x: 1,
            bounds_y: 1,
            bounds_width: 2,
            bounds_height: 2,
            point_count: 4,
            contour_point_count: 4,
            connected_contour_length: 4,
            component_count: 1,
            largest_component: 4,
            perimeter: 5.25,
        }];

        let csv_path = write_summary_csv(&rows, &dir).unwrap();
        let json_path = write_summary_json(&rows, &dir).unwrap();
        let csv = fs::read_to_string(csv_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        let _ = fs::remove_dir_all(&dir);

        assert!(csv.starts_with("filename,subfolder,image_width"));
        assert_eq!(json[0]["point_count"], 4);
        assert_eq!(json[0]["filename"], "leaf");
    }
}
