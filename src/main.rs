fn main() -> anyhow::Result<()> {
    gaze_recorder_lib::run()
}
